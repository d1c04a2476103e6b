//! Vectorised backtest of the crossover rule.
//!
//! The executed position lags the signal-implied position by one bar: the
//! decision taken at the close of bar t earns the return of bar t+1. The
//! engine keeps no state between runs; every `run` returns a fresh
//! [`BacktestResult`].

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::error::MacrossError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::SignalEngine;
use crate::domain::trade_log::{TradeRecord, build_trade_log};

/// Sharpe annualisation factor. Only correct for daily bars; other bar
/// periods must set [`BacktestConfig::with_periods_per_year`].
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_COMMISSION_RATE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    initial_capital: f64,
    commission_rate: f64,
    periods_per_year: f64,
}

impl BacktestConfig {
    /// `commission_rate` is proportional and charged once per change of the
    /// executed position.
    pub fn new(initial_capital: f64, commission_rate: f64) -> Result<Self, MacrossError> {
        if !initial_capital.is_finite() || initial_capital <= 0.0 {
            return Err(MacrossError::invalid_parameter(
                "initial_capital",
                format!("must be positive, got {initial_capital}"),
            ));
        }
        if !commission_rate.is_finite() || commission_rate < 0.0 {
            return Err(MacrossError::invalid_parameter(
                "commission_rate",
                format!("must be non-negative, got {commission_rate}"),
            ));
        }
        Ok(BacktestConfig {
            initial_capital,
            commission_rate,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        })
    }

    pub fn with_periods_per_year(self, periods_per_year: f64) -> Result<Self, MacrossError> {
        if !periods_per_year.is_finite() || periods_per_year <= 0.0 {
            return Err(MacrossError::invalid_parameter(
                "periods_per_year",
                format!("must be positive, got {periods_per_year}"),
            ));
        }
        Ok(BacktestConfig {
            periods_per_year,
            ..self
        })
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn commission_rate(&self) -> f64 {
        self.commission_rate
    }

    pub fn periods_per_year(&self) -> f64 {
        self.periods_per_year
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            commission_rate: DEFAULT_COMMISSION_RATE,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        }
    }
}

/// One bar of the simulation table.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRow {
    pub date: NaiveDate,
    pub close: f64,
    pub short_ma: f64,
    pub long_ma: f64,
    /// 1 when `short_ma > long_ma` on this bar.
    pub position_signal: u8,
    /// Previous bar's `position_signal`; 0 on the first row.
    pub position: u8,
    pub pct_change: f64,
    /// 1 when `position` differs from the previous row's.
    pub trade_action: u8,
    pub strategy_return: f64,
    pub equity_curve: f64,
    pub benchmark_curve: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub initial_capital: f64,
    pub periods_per_year: f64,
    pub rows: Vec<SimulationRow>,
}

impl BacktestResult {
    pub fn empty(config: &BacktestConfig) -> Self {
        BacktestResult {
            initial_capital: config.initial_capital,
            periods_per_year: config.periods_per_year,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn equity_curve(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.equity_curve).collect()
    }

    pub fn benchmark_curve(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.benchmark_curve).collect()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.rows.last().map(|r| r.equity_curve)
    }

    pub fn metrics(&self) -> Option<PerformanceMetrics> {
        PerformanceMetrics::compute(self)
    }

    pub fn trade_log(&self) -> Vec<TradeRecord> {
        build_trade_log(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestEngine {
    signal_engine: SignalEngine,
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(signal_engine: SignalEngine, config: BacktestConfig) -> Self {
        BacktestEngine {
            signal_engine,
            config,
        }
    }

    pub fn signal_engine(&self) -> &SignalEngine {
        &self.signal_engine
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Simulate the strategy over `bars`. Rows where either average is still
    /// warming up are excluded from the table.
    pub fn run(&self, bars: &[OhlcvBar]) -> BacktestResult {
        let mut result = BacktestResult::empty(&self.config);
        if bars.is_empty() {
            return result;
        }

        let commission_rate = self.config.commission_rate;
        let mut equity = self.config.initial_capital;
        let mut benchmark = self.config.initial_capital;
        // (position_signal, position, close) of the previous retained row
        let mut prev: Option<(u8, u8, f64)> = None;

        for row in self.signal_engine.calculate_indicators(bars) {
            let Some((short_ma, long_ma)) = row.mas() else {
                continue;
            };

            let close = row.bar.close;
            let position_signal = u8::from(short_ma > long_ma);
            let (position, pct_change, trade_action) = match prev {
                None => (0, 0.0, 0),
                Some((prev_signal, prev_position, prev_close)) => (
                    prev_signal,
                    (close - prev_close) / prev_close,
                    prev_signal.abs_diff(prev_position),
                ),
            };

            let strategy_return =
                f64::from(position) * pct_change - commission_rate * f64::from(trade_action);
            equity *= 1.0 + strategy_return;
            benchmark *= 1.0 + pct_change;

            result.rows.push(SimulationRow {
                date: row.bar.date,
                close,
                short_ma,
                long_ma,
                position_signal,
                position,
                pct_change,
                trade_action,
                strategy_return,
                equity_curve: equity,
                benchmark_curve: benchmark,
            });
            prev = Some((position_signal, position, close));
        }

        debug!(
            bars = bars.len(),
            rows = result.rows.len(),
            final_equity = equity,
            "backtest complete"
        );
        result
    }
}
