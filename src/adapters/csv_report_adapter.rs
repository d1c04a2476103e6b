//! CSV report adapter.
//!
//! Writes into the output directory: `simulation.csv` (one row per
//! simulated bar), `equity.csv` (strategy vs buy-and-hold equity),
//! `trades.csv` and `metrics.csv` (the named report rows), plus an
//! `equity.svg` plot. The `chart` command writes `chart.csv` and
//! `chart.svg` through [`CsvReportAdapter::write_chart`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::adapters::svg_plot::{CHART_PLOT_FILE, EQUITY_PLOT_FILE, plot_chart, plot_equity};
use crate::domain::backtest::BacktestResult;
use crate::domain::error::MacrossError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::signal::{IndicatorRow, SignalEngine};
use crate::domain::trade_log::TradeRecord;
use crate::ports::report_port::ReportPort;
use tracing::info;

pub const SIMULATION_FILE: &str = "simulation.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const METRICS_FILE: &str = "metrics.csv";
pub const EQUITY_FILE: &str = "equity.csv";
pub const CHART_FILE: &str = "chart.csv";

const SIMULATION_HEADER: [&str; 11] = [
    "date",
    "close",
    "short_ma",
    "long_ma",
    "position_signal",
    "position",
    "pct_change",
    "trade_action",
    "strategy_return",
    "equity_curve",
    "benchmark_curve",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn write_simulation(result: &BacktestResult, path: &Path) -> Result<(), MacrossError> {
        let mut wtr = csv::Writer::from_path(path).map_err(report_err)?;
        wtr.write_record(SIMULATION_HEADER).map_err(report_err)?;
        for row in &result.rows {
            wtr.write_record([
                row.date.format("%Y-%m-%d").to_string(),
                row.close.to_string(),
                row.short_ma.to_string(),
                row.long_ma.to_string(),
                row.position_signal.to_string(),
                row.position.to_string(),
                row.pct_change.to_string(),
                row.trade_action.to_string(),
                row.strategy_return.to_string(),
                row.equity_curve.to_string(),
                row.benchmark_curve.to_string(),
            ])
            .map_err(report_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_equity(result: &BacktestResult, path: &Path) -> Result<(), MacrossError> {
        let mut wtr = csv::Writer::from_path(path).map_err(report_err)?;
        wtr.write_record(["date", "strategy", "benchmark"])
            .map_err(report_err)?;
        for row in &result.rows {
            wtr.write_record([
                row.date.format("%Y-%m-%d").to_string(),
                format!("{:.2}", row.equity_curve),
                format!("{:.2}", row.benchmark_curve),
            ])
            .map_err(report_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write close and both averages per row to `<output_dir>/chart.csv`.
    pub fn write_chart(
        &self,
        rows: &[IndicatorRow],
        engine: &SignalEngine,
        output_dir: &Path,
    ) -> Result<PathBuf, MacrossError> {
        create_output_dir(output_dir)?;
        let path = output_dir.join(CHART_FILE);
        let short = engine.short_label().to_string();
        let long = engine.long_label().to_string();

        let mut wtr = csv::Writer::from_path(&path).map_err(report_err)?;
        wtr.write_record(["date", "close", short.as_str(), long.as_str()])
            .map_err(report_err)?;
        for row in rows {
            let cell = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
            wtr.write_record([
                row.bar.date.format("%Y-%m-%d").to_string(),
                row.bar.close.to_string(),
                cell(row.short_ma),
                cell(row.long_ma),
            ])
            .map_err(report_err)?;
        }
        wtr.flush()?;
        plot_chart(rows, &output_dir.join(CHART_PLOT_FILE))?;

        info!(path = %path.display(), rows = rows.len(), "chart written");
        Ok(path)
    }

    fn write_trades(trades: &[TradeRecord], path: &Path) -> Result<(), MacrossError> {
        let mut wtr = csv::Writer::from_path(path).map_err(report_err)?;
        wtr.write_record(["type", "date", "price", "pnl", "pnl_pct"])
            .map_err(report_err)?;
        for trade in trades {
            wtr.write_record([
                trade.trade_type.to_string(),
                trade.date.format("%Y-%m-%d").to_string(),
                trade.price.to_string(),
                trade.pnl.to_string(),
                trade.pnl_pct.map(|p| p.to_string()).unwrap_or_default(),
            ])
            .map_err(report_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_metrics(metrics: &PerformanceMetrics, path: &Path) -> Result<(), MacrossError> {
        let mut wtr = csv::Writer::from_path(path).map_err(report_err)?;
        wtr.write_record(["metric", "value"]).map_err(report_err)?;
        for (name, value) in metrics.report_rows() {
            wtr.write_record([name, value.as_str()]).map_err(report_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn create_output_dir(dir: &Path) -> Result<(), MacrossError> {
    fs::create_dir_all(dir).map_err(|e| MacrossError::Report {
        reason: format!("cannot create {}: {}", dir.display(), e),
    })
}

fn report_err(e: csv::Error) -> MacrossError {
    MacrossError::Report {
        reason: format!("CSV write error: {e}"),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &PerformanceMetrics,
        trades: &[TradeRecord],
        output_dir: &Path,
    ) -> Result<(), MacrossError> {
        create_output_dir(output_dir)?;

        Self::write_simulation(result, &output_dir.join(SIMULATION_FILE))?;
        Self::write_equity(result, &output_dir.join(EQUITY_FILE))?;
        Self::write_trades(trades, &output_dir.join(TRADES_FILE))?;
        Self::write_metrics(metrics, &output_dir.join(METRICS_FILE))?;
        plot_equity(result, &output_dir.join(EQUITY_PLOT_FILE))?;

        info!(dir = %output_dir.display(), rows = result.len(), "report written");
        Ok(())
    }
}
