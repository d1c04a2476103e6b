//! Domain error types.

/// Top-level error type for macross.
#[derive(Debug, thiserror::Error)]
pub enum MacrossError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MacrossError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        MacrossError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&MacrossError> for std::process::ExitCode {
    fn from(err: &MacrossError) -> Self {
        let code: u8 = match err {
            MacrossError::Io(_) | MacrossError::Report { .. } => 1,
            MacrossError::ConfigParse { .. }
            | MacrossError::ConfigMissing { .. }
            | MacrossError::ConfigInvalid { .. } => 2,
            MacrossError::InvalidParameter { .. } => 3,
            MacrossError::Data { .. }
            | MacrossError::NoData { .. }
            | MacrossError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_insufficient_data() {
        let err = MacrossError::InsufficientData {
            symbol: "SPY.US".into(),
            bars: 10,
            minimum: 21,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for SPY.US: have 10 bars, need 21"
        );
    }

    #[test]
    fn display_config_invalid() {
        let err = MacrossError::ConfigInvalid {
            section: "strategy".into(),
            key: "long_ma_period".into(),
            reason: "must exceed short_ma_period".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [strategy] long_ma_period: must exceed short_ma_period"
        );
    }

    #[test]
    fn invalid_parameter_helper() {
        let err = MacrossError::invalid_parameter("short_window", "must be positive");
        assert!(
            matches!(err, MacrossError::InvalidParameter { ref name, .. } if name == "short_window")
        );
    }

    #[test]
    fn exit_codes_differ_by_category() {
        use std::process::ExitCode;

        let io = MacrossError::Io(std::io::Error::other("boom"));
        let cfg = MacrossError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        };
        let data = MacrossError::NoData {
            symbol: "SPY.US".into(),
        };
        let code = |err: &MacrossError| format!("{:?}", ExitCode::from(err));
        assert_eq!(code(&io), format!("{:?}", ExitCode::from(1)));
        assert_eq!(code(&cfg), format!("{:?}", ExitCode::from(2)));
        assert_eq!(code(&data), format!("{:?}", ExitCode::from(5)));
    }
}
