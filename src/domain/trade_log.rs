//! Discrete trade log reconstructed from a backtest result.
//!
//! The log replays the signal-implied position (`position_signal`), not the
//! lagged executed position the equity curve is built from. A BUY is dated
//! on the bar whose close turned the signal long, one bar before the equity
//! curve starts earning. The log is what the signal said; the equity curve
//! is what was realised.

use chrono::NaiveDate;
use std::fmt;
use tracing::warn;

use super::backtest::BacktestResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeType {
    Buy,
    Sell,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Buy => f.write_str("BUY"),
            TradeType::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub trade_type: TradeType,
    pub date: NaiveDate,
    pub price: f64,
    /// `close - entry_price` for a SELL, 0 for a BUY.
    pub pnl: f64,
    /// `pnl / entry_price`; `None` when the entry price was 0.
    pub pnl_pct: Option<f64>,
}

/// Walk the result in date order, emitting a BUY on every 0 -> 1 signal
/// transition and a SELL on every 1 -> 0. An open position at the end is
/// left open.
pub fn build_trade_log(result: &BacktestResult) -> Vec<TradeRecord> {
    let mut trades = Vec::new();
    let mut entry_price: Option<f64> = None;

    for row in &result.rows {
        match (row.position_signal, entry_price) {
            (1, None) => {
                entry_price = Some(row.close);
                trades.push(TradeRecord {
                    trade_type: TradeType::Buy,
                    date: row.date,
                    price: row.close,
                    pnl: 0.0,
                    pnl_pct: Some(0.0),
                });
            }
            (0, Some(entry)) => {
                entry_price = None;
                let pnl = row.close - entry;
                let pnl_pct = if entry != 0.0 {
                    Some(pnl / entry)
                } else {
                    warn!(date = %row.date, "entry price is zero, pnl_pct undefined");
                    None
                };
                trades.push(TradeRecord {
                    trade_type: TradeType::Sell,
                    date: row.date,
                    price: row.close,
                    pnl,
                    pnl_pct,
                });
            }
            _ => {}
        }
    }

    trades
}
