//! Dual moving-average crossover signal detection.
//!
//! `SignalEngine` turns an ordered bar history into trailing short/long SMAs
//! and a single current decision. A signal is always derived from the two
//! most recent indicator rows, never from a later bar.

use chrono::NaiveDate;
use std::fmt;
use tracing::{debug, warn};

use crate::domain::error::MacrossError;
use crate::domain::indicator::MaLabel;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::ohlcv::{OhlcvBar, is_strictly_ascending};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub signal_type: SignalType,
    /// Date of the bar the decision was taken on; `None` only for empty input.
    pub date: Option<NaiveDate>,
    pub price: f64,
    pub short_ma: f64,
    pub long_ma: f64,
    pub reason: String,
}

impl Signal {
    fn hold(date: Option<NaiveDate>, price: f64, reason: String) -> Self {
        Signal {
            signal_type: SignalType::Hold,
            date,
            price,
            short_ma: 0.0,
            long_ma: 0.0,
            reason,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date {
            Some(date) => write!(f, "[{}] ", date)?,
            None => write!(f, "[-] ")?,
        }
        write!(
            f,
            "{}: {} (Price: {:.2})",
            self.signal_type, self.reason, self.price
        )
    }
}

/// A bar augmented with its trailing moving averages. `None` marks the
/// warm-up period of the respective window.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub bar: OhlcvBar,
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
}

impl IndicatorRow {
    /// Both averages, once both windows are filled.
    pub fn mas(&self) -> Option<(f64, f64)> {
        Some((self.short_ma?, self.long_ma?))
    }
}

/// Classify the transition between two consecutive `(short_ma, long_ma)` pairs.
///
/// Equality on the crossing bar resolves to a signal: `<` then `>=` is a
/// golden cross, `>` then `<=` a death cross.
pub fn classify_crossover(prev: (f64, f64), curr: (f64, f64)) -> SignalType {
    let (short_prev, long_prev) = prev;
    let (short_curr, long_curr) = curr;
    if short_prev < long_prev && short_curr >= long_curr {
        SignalType::Buy
    } else if short_prev > long_prev && short_curr <= long_curr {
        SignalType::Sell
    } else {
        SignalType::Hold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalEngine {
    short_window: usize,
    long_window: usize,
}

impl SignalEngine {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, MacrossError> {
        if short_window == 0 {
            return Err(MacrossError::invalid_parameter(
                "short_window",
                "must be positive",
            ));
        }
        if long_window == 0 {
            return Err(MacrossError::invalid_parameter(
                "long_window",
                "must be positive",
            ));
        }
        if short_window >= long_window {
            return Err(MacrossError::invalid_parameter(
                "long_window",
                format!("must exceed short_window ({short_window}), got {long_window}"),
            ));
        }
        Ok(SignalEngine {
            short_window,
            long_window,
        })
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }

    /// Minimum history `check_signal` needs to compare two complete rows.
    pub fn min_bars(&self) -> usize {
        self.long_window + 1
    }

    pub fn short_label(&self) -> MaLabel {
        MaLabel(self.short_window)
    }

    pub fn long_label(&self) -> MaLabel {
        MaLabel(self.long_window)
    }

    /// Sort by date if needed and attach both trailing SMAs to every bar.
    pub fn calculate_indicators(&self, bars: &[OhlcvBar]) -> Vec<IndicatorRow> {
        if bars.is_empty() {
            return Vec::new();
        }

        let mut sorted = bars.to_vec();
        if !is_strictly_ascending(&sorted) {
            sorted.sort_by_key(|b| b.date);
        }

        let short = calculate_sma(&sorted, self.short_window);
        let long = calculate_sma(&sorted, self.long_window);

        sorted
            .into_iter()
            .zip(short.values.iter().zip(long.values.iter()))
            .map(|(bar, (s, l))| IndicatorRow {
                bar,
                short_ma: s.get(),
                long_ma: l.get(),
            })
            .collect()
    }

    pub fn check_signal(&self, bars: &[OhlcvBar]) -> Signal {
        let needed = self.min_bars();
        if bars.len() < needed {
            let reason = format!(
                "insufficient data: have {} bars, need {}",
                bars.len(),
                needed
            );
            warn!("{reason}");
            let last = bars.iter().max_by_key(|b| b.date);
            return Signal::hold(last.map(|b| b.date), last.map_or(0.0, |b| b.close), reason);
        }

        let rows = self.calculate_indicators(bars);
        let [.., prev, curr] = rows.as_slice() else {
            return Signal::hold(None, 0.0, "insufficient data".to_string());
        };

        let date = Some(curr.bar.date);
        let price = curr.bar.close;

        let (Some(prev_mas), Some(curr_mas)) = (prev.mas(), curr.mas()) else {
            return Signal::hold(
                date,
                price,
                "calculating MAs (not enough warm-up data)".to_string(),
            );
        };

        let (short_ma, long_ma) = curr_mas;
        let short_label = self.short_label();
        let long_label = self.long_label();
        let signal_type = classify_crossover(prev_mas, curr_mas);
        let reason = match signal_type {
            SignalType::Buy => format!(
                "Golden Cross: {short_label} ({short_ma:.2}) crossed above {long_label} ({long_ma:.2})"
            ),
            SignalType::Sell => format!(
                "Death Cross: {short_label} ({short_ma:.2}) crossed below {long_label} ({long_ma:.2})"
            ),
            SignalType::Hold => format!("{short_label}:{short_ma:.2}, {long_label}:{long_ma:.2}"),
        };

        debug!(signal = %signal_type, date = %curr.bar.date, "{reason}");

        Signal {
            signal_type,
            date,
            price,
            short_ma,
            long_ma,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                OhlcvBar::from_close(start + chrono::Duration::days(i as i64), close)
            })
            .collect()
    }

    fn engine() -> SignalEngine {
        SignalEngine::new(2, 3).unwrap()
    }

    #[test]
    fn new_rejects_zero_windows() {
        assert!(matches!(
            SignalEngine::new(0, 3),
            Err(MacrossError::InvalidParameter { ref name, .. }) if name == "short_window"
        ));
        assert!(SignalEngine::new(2, 0).is_err());
    }

    #[test]
    fn new_rejects_unordered_windows() {
        assert!(SignalEngine::new(3, 3).is_err());
        assert!(SignalEngine::new(20, 5).is_err());
        assert!(SignalEngine::new(5, 20).is_ok());
    }

    #[test]
    fn indicators_warmup_is_undefined() {
        let rows = engine().calculate_indicators(&make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0]));
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].short_ma, None);
        assert_relative_eq!(rows[1].short_ma.unwrap(), 100.5);
        assert_eq!(rows[1].long_ma, None);
        assert_relative_eq!(rows[2].long_ma.unwrap(), 101.0);
        assert_eq!(rows[1].mas(), None);
        assert!(rows[2].mas().is_some());
    }

    #[test]
    fn indicators_sort_unordered_input() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        bars.reverse();
        let rows = engine().calculate_indicators(&bars);
        let closes: Vec<f64> = rows.iter().map(|r| r.bar.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(rows[3].short_ma.unwrap(), 3.5);
    }

    #[test]
    fn indicators_empty_input() {
        assert!(engine().calculate_indicators(&[]).is_empty());
    }

    #[test]
    fn signal_insufficient_data() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let signal = engine().check_signal(&bars);
        assert_eq!(signal.signal_type, SignalType::Hold);
        assert_eq!(signal.price, 12.0);
        assert_eq!(signal.date, Some(bars[2].date));
        assert_eq!(signal.short_ma, 0.0);
        assert_eq!(signal.long_ma, 0.0);
        assert!(signal.reason.contains("insufficient data"));
        assert!(signal.reason.contains("need 4"));
    }

    #[test]
    fn signal_empty_input() {
        let signal = engine().check_signal(&[]);
        assert_eq!(signal.signal_type, SignalType::Hold);
        assert_eq!(signal.date, None);
        assert_eq!(signal.price, 0.0);
    }

    #[test]
    fn signal_golden_cross() {
        // prev: MA2 9.5 < MA3 9.67, curr: MA2 10.5 >= MA3 10.33
        let signal = engine().check_signal(&make_bars(&[10.0, 10.0, 10.0, 9.0, 12.0]));
        assert_eq!(signal.signal_type, SignalType::Buy);
        assert!(signal.reason.starts_with("Golden Cross: MA2"));
        assert_relative_eq!(signal.short_ma, 10.5);
        assert_relative_eq!(signal.long_ma, 31.0 / 3.0, epsilon = 1e-12);
        assert_eq!(signal.price, 12.0);
    }

    #[test]
    fn signal_death_cross() {
        let signal = engine().check_signal(&make_bars(&[10.0, 10.0, 10.0, 11.0, 8.0]));
        assert_eq!(signal.signal_type, SignalType::Sell);
        assert!(signal.reason.starts_with("Death Cross"));
    }

    #[test]
    fn signal_equality_on_crossing_bar_is_buy() {
        // curr: MA2 = MA3 = 8, prev: MA2 7 < MA3 8
        let signal = engine().check_signal(&make_bars(&[10.0, 10.0, 8.0, 6.0, 10.0]));
        assert_eq!(signal.signal_type, SignalType::Buy);
        assert_eq!(signal.short_ma, signal.long_ma);
    }

    #[test]
    fn signal_equality_on_crossing_bar_is_sell() {
        let signal = engine().check_signal(&make_bars(&[10.0, 10.0, 12.0, 14.0, 10.0]));
        assert_eq!(signal.signal_type, SignalType::Sell);
    }

    #[test]
    fn signal_flat_market_holds() {
        let signal = engine().check_signal(&make_bars(&[5.0; 6]));
        assert_eq!(signal.signal_type, SignalType::Hold);
        assert_eq!(signal.reason, "MA2:5.00, MA3:5.00");
    }

    #[test]
    fn signal_flat_tail_after_noise_has_equal_mas() {
        let mut prices = vec![0.1, 0.7, 0.3, 1.9, 0.2, 3.3];
        prices.extend([5.0; 20]);
        let engine = SignalEngine::new(2, 5).unwrap();

        let signal = engine.check_signal(&make_bars(&prices));
        assert_eq!(signal.signal_type, SignalType::Hold);
        assert_eq!(signal.short_ma, 5.0);
        assert_eq!(signal.long_ma, 5.0);

        let rows = engine.calculate_indicators(&make_bars(&prices));
        let (short, long) = rows.last().unwrap().mas().unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn signal_trend_without_cross_holds() {
        let signal = engine().check_signal(&make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0]));
        assert_eq!(signal.signal_type, SignalType::Hold);
        assert_relative_eq!(signal.short_ma, 103.5);
        assert_relative_eq!(signal.long_ma, 103.0);
    }

    #[test]
    fn signal_ignores_input_order() {
        let bars = make_bars(&[10.0, 10.0, 10.0, 9.0, 12.0]);
        let mut shuffled = bars.clone();
        shuffled.swap(0, 4);
        shuffled.swap(1, 3);
        assert_eq!(engine().check_signal(&bars), engine().check_signal(&shuffled));
    }

    #[test]
    fn classify_crossover_boundaries() {
        assert_eq!(classify_crossover((1.0, 2.0), (2.0, 2.0)), SignalType::Buy);
        assert_eq!(classify_crossover((3.0, 2.0), (2.0, 2.0)), SignalType::Sell);
        assert_eq!(classify_crossover((2.0, 2.0), (3.0, 2.0)), SignalType::Hold);
        assert_eq!(classify_crossover((2.0, 2.0), (1.0, 2.0)), SignalType::Hold);
        assert_eq!(classify_crossover((1.0, 2.0), (1.5, 2.0)), SignalType::Hold);
    }

    #[test]
    fn signal_display() {
        let signal = Signal {
            signal_type: SignalType::Buy,
            date: NaiveDate::from_ymd_opt(2024, 3, 1),
            price: 101.256,
            short_ma: 1.0,
            long_ma: 1.0,
            reason: "Golden Cross".into(),
        };
        assert_eq!(
            signal.to_string(),
            "[2024-03-01] BUY: Golden Cross (Price: 101.26)"
        );
        let empty = engine().check_signal(&[]);
        assert!(empty.to_string().starts_with("[-] HOLD: insufficient data"));
    }
}
