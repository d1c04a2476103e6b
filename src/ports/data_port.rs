//! Market data access port trait.
//!
//! Implementations return bars sorted by date without duplicates.

use crate::domain::error::MacrossError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, MacrossError>;

    fn list_symbols(&self) -> Result<Vec<String>, MacrossError>;

    /// First date, last date and bar count, or `None` when the symbol has no bars.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, MacrossError>;

    /// The most recent `count` bars of `symbol`.
    fn fetch_latest(&self, symbol: &str, count: usize) -> Result<Vec<OhlcvBar>, MacrossError> {
        let mut bars = self.fetch_ohlcv(symbol, NaiveDate::MIN, NaiveDate::MAX)?;
        let skip = bars.len().saturating_sub(count);
        Ok(bars.split_off(skip))
    }
}
