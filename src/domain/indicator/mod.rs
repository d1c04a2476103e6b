//! Technical indicator series.
//!
//! - `IndicatorPoint`: a single point in an indicator time series
//! - `IndicatorSeries`: a time series of indicator values for one period

pub mod sma;

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    /// The value, or `None` while the indicator is still warming up.
    pub fn get(&self) -> Option<f64> {
        self.valid.then_some(self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub period: usize,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn empty(period: usize) -> Self {
        IndicatorSeries {
            period,
            values: Vec::new(),
        }
    }
}

/// Column label of a moving average, e.g. `MA20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaLabel(pub usize);

impl fmt::Display for MaLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MA{}", self.0)
    }
}
