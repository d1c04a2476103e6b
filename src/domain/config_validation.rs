//! Configuration validation.
//!
//! Validates all config fields before an engine is built. Keys that are
//! absent fall back to the defaults below.

use crate::domain::backtest::{
    DEFAULT_COMMISSION_RATE, DEFAULT_INITIAL_CAPITAL, TRADING_DAYS_PER_YEAR,
};
use crate::domain::error::MacrossError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_SHORT_MA_PERIOD: i64 = 5;
pub const DEFAULT_LONG_MA_PERIOD: i64 = 20;
pub const DEFAULT_DAYS: i64 = 730;
pub const DEFAULT_SYMBOL: &str = "SPY.US";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    validate_data_config(config)?;
    validate_strategy_config(config)?;
    validate_backtest_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    config.require_string("data", "dir")?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    let short = config.get_int("strategy", "short_ma_period", DEFAULT_SHORT_MA_PERIOD);
    if short < 1 {
        return Err(invalid(
            "strategy",
            "short_ma_period",
            "short_ma_period must be at least 1",
        ));
    }
    let long = config.get_int("strategy", "long_ma_period", DEFAULT_LONG_MA_PERIOD);
    if long <= short {
        return Err(invalid(
            "strategy",
            "long_ma_period",
            "long_ma_period must be greater than short_ma_period",
        ));
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    validate_initial_capital(config)?;
    validate_commission_rate(config)?;
    validate_days(config)?;
    validate_periods_per_year(config)?;
    validate_symbol(config)?;
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    let value = config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_commission_rate(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    let value = config.get_double("backtest", "commission_rate", DEFAULT_COMMISSION_RATE);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "commission_rate",
            "commission_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_days(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    let value = config.get_int("backtest", "days", DEFAULT_DAYS);
    if value < 1 {
        return Err(invalid("backtest", "days", "days must be at least 1"));
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    let value = config.get_double("backtest", "periods_per_year", TRADING_DAYS_PER_YEAR);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    match config.get_string("backtest", "symbol") {
        Some(s) if s.trim().is_empty() => Err(invalid(
            "backtest",
            "symbol",
            "symbol must not be empty",
        )),
        _ => Ok(()),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> MacrossError {
    MacrossError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_full_config_passes() {
        let config = make_config(
            r#"
[data]
dir = ./data

[strategy]
short_ma_period = 5
long_ma_period = 20

[backtest]
symbol = SPY.US
initial_capital = 100000.0
commission_rate = 0.001
days = 730
periods_per_year = 252
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn defaults_are_valid() {
        let config = make_config("[data]\ndir = ./data\n");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn missing_data_dir_fails() {
        let config = make_config("[strategy]\nshort_ma_period = 5\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, MacrossError::ConfigMissing { key, .. } if key == "dir"));
    }

    #[test]
    fn short_period_zero_fails() {
        let config = make_config("[strategy]\nshort_ma_period = 0\nlong_ma_period = 20\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(
            matches!(err, MacrossError::ConfigInvalid { key, .. } if key == "short_ma_period")
        );
    }

    #[test]
    fn long_period_not_above_short_fails() {
        let config = make_config("[strategy]\nshort_ma_period = 20\nlong_ma_period = 20\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(matches!(err, MacrossError::ConfigInvalid { key, .. } if key == "long_ma_period"));

        let config = make_config("[strategy]\nshort_ma_period = 30\n");
        assert!(validate_strategy_config(&config).is_err());
    }

    #[test]
    fn initial_capital_zero_fails() {
        let config = make_config("[backtest]\ninitial_capital = 0\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(
            matches!(err, MacrossError::ConfigInvalid { key, .. } if key == "initial_capital")
        );
    }

    #[test]
    fn commission_rate_out_of_range_fails() {
        for value in ["-0.001", "1.0", "2"] {
            let config = make_config(&format!("[backtest]\ncommission_rate = {value}\n"));
            let err = validate_backtest_config(&config).unwrap_err();
            assert!(
                matches!(err, MacrossError::ConfigInvalid { ref key, .. } if key == "commission_rate"),
                "commission_rate = {value} should fail"
            );
        }
    }

    #[test]
    fn commission_rate_zero_passes() {
        let config = make_config("[backtest]\ncommission_rate = 0\n");
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn days_zero_fails() {
        let config = make_config("[backtest]\ndays = 0\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, MacrossError::ConfigInvalid { key, .. } if key == "days"));
    }

    #[test]
    fn periods_per_year_negative_fails() {
        let config = make_config("[backtest]\nperiods_per_year = -52\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(
            matches!(err, MacrossError::ConfigInvalid { key, .. } if key == "periods_per_year")
        );
    }
}
