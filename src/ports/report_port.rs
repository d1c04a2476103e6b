//! Report generation port trait.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MacrossError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::trade_log::TradeRecord;

/// Port for persisting a completed backtest.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &PerformanceMetrics,
        trades: &[TradeRecord],
        output_dir: &Path,
    ) -> Result<(), MacrossError>;
}
