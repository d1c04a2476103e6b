//! CSV file data adapter.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, with the header
//! `date,open,high,low,close,volume` and `%Y-%m-%d` dates. Every close
//! must be finite and positive; the engine divides by it.

use crate::domain::error::MacrossError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

const CSV_EXTENSION: &str = ".csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}{CSV_EXTENSION}"))
    }

    /// Every bar in the symbol's file, sorted by date.
    fn read_all(&self, symbol: &str) -> Result<Vec<OhlcvBar>, MacrossError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MacrossError::NoData {
                symbol: symbol.to_string(),
            },
            _ => MacrossError::Data {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| MacrossError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            bars.push(parse_bar(&record).map_err(|reason| MacrossError::Data {
                reason: format!("{}: row {}: {}", path.display(), line + 1, reason),
            })?);
        }

        bars.sort_by_key(|b| b.date);
        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(MacrossError::Data {
                reason: format!("{}: duplicate date {}", path.display(), pair[0].date),
            });
        }

        debug!(symbol, bars = bars.len(), "loaded csv");
        Ok(bars)
    }
}

fn parse_bar(record: &StringRecord) -> Result<OhlcvBar, String> {
    let date_str = field(record, 0, "date")?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{date_str}': {e}"))?;

    let close = parse_number(record, 4, "close")?;
    if !close.is_finite() || close <= 0.0 {
        return Err(format!("close must be a positive number, got {close}"));
    }

    Ok(OhlcvBar {
        date,
        open: parse_number(record, 1, "open")?,
        high: parse_number(record, 2, "high")?,
        low: parse_number(record, 3, "low")?,
        close,
        volume: parse_number(record, 5, "volume")?,
    })
}

fn field<'a>(record: &'a StringRecord, index: usize, name: &str) -> Result<&'a str, String> {
    record
        .get(index)
        .ok_or_else(|| format!("missing {name} column"))
}

fn parse_number(record: &StringRecord, index: usize, name: &str) -> Result<f64, String> {
    let raw = field(record, index, name)?;
    raw.parse()
        .map_err(|e| format!("invalid {name} value '{raw}': {e}"))
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, MacrossError> {
        let mut bars = self.read_all(symbol)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, MacrossError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| MacrossError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| MacrossError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(CSV_EXTENSION) {
                if !symbol.is_empty() {
                    symbols.push(symbol.to_string());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, MacrossError> {
        let bars = self.read_all(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
