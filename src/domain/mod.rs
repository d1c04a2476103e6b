//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod signal;
pub mod backtest;
pub mod metrics;
pub mod trade_log;
pub mod config_validation;
pub mod error;
