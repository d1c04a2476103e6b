//! Performance metrics derived from a completed backtest.

use chrono::NaiveDate;

use super::backtest::BacktestResult;

/// Calendar days per year used for CAGR. Independent of bar period.
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: i64,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub benchmark_return: f64,
    pub cagr: f64,
    /// Largest relative decline from the running peak; always <= 0.
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    /// Changes of the executed (lagged) position, entries and exits alike.
    pub total_trades: usize,
}

impl PerformanceMetrics {
    /// `None` when the result holds no simulated rows.
    pub fn compute(result: &BacktestResult) -> Option<Self> {
        let first = result.rows.first()?;
        let last = result.rows.last()?;
        let initial_capital = result.initial_capital;

        let total_return = last.equity_curve / initial_capital - 1.0;
        let benchmark_return = last.benchmark_curve / initial_capital - 1.0;

        let duration_days = (last.date - first.date).num_days();
        let years = if duration_days > 0 {
            duration_days as f64 / CALENDAR_DAYS_PER_YEAR
        } else {
            0.0
        };
        let cagr = if years > 0.0 {
            (last.equity_curve / initial_capital).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let equity = result.equity_curve();
        let max_drawdown = drawdown_series(&equity)
            .into_iter()
            .fold(0.0_f64, f64::min);

        let returns: Vec<f64> = result.rows.iter().map(|r| r.strategy_return).collect();
        let sharpe_ratio = compute_sharpe(&returns, result.periods_per_year);

        let total_trades = result
            .rows
            .iter()
            .map(|r| usize::from(r.trade_action))
            .sum();

        Some(PerformanceMetrics {
            start_date: first.date,
            end_date: last.date,
            duration_days,
            initial_capital,
            final_equity: last.equity_curve,
            total_return,
            benchmark_return,
            cagr,
            max_drawdown,
            sharpe_ratio,
            total_trades,
        })
    }

    /// Named, formatted rows in report order.
    pub fn report_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Start Date", self.start_date.format("%Y-%m-%d").to_string()),
            ("End Date", self.end_date.format("%Y-%m-%d").to_string()),
            ("Duration (Days)", self.duration_days.to_string()),
            ("Initial Capital", format!("{:.2}", self.initial_capital)),
            ("Final Equity", format!("{:.2}", self.final_equity)),
            ("Total Return", format_pct(self.total_return)),
            ("Benchmark Return", format_pct(self.benchmark_return)),
            ("CAGR", format_pct(self.cagr)),
            ("Max Drawdown", format_pct(self.max_drawdown)),
            ("Sharpe Ratio", format!("{:.2}", self.sharpe_ratio)),
            ("Total Trades", self.total_trades.to_string()),
        ]
    }
}

pub fn format_pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Relative distance of each point from its running maximum (<= 0).
pub fn drawdown_series(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&value| {
            peak = peak.max(value);
            (value - peak) / peak
        })
        .collect()
}

/// Annualised mean/stddev ratio with a zero risk-free rate.
///
/// Uses the sample standard deviation. Zero variance, or fewer than two
/// returns, yields 0.
fn compute_sharpe(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev != 0.0 {
        mean / stddev * periods_per_year.sqrt()
    } else {
        0.0
    }
}
