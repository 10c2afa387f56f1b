//! Error taxonomy and process exit-code mapping.

use super::accountant::ReplayError;
use super::instrument::InvalidInstrument;
use super::trade::InvalidTrade;

/// Top-level error type for bandcost.
#[derive(Debug, thiserror::Error)]
pub enum BandcostError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

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

    #[error("instrument {code} already exists")]
    DuplicateInstrument { code: String },

    #[error("unknown instrument {code}")]
    UnknownInstrument { code: String },

    #[error("no trade with id {id}")]
    UnknownTrade { id: i64 },

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    InvalidTrade(#[from] InvalidTrade),

    #[error(transparent)]
    InvalidInstrument(#[from] InvalidInstrument),

    #[error("CSV error at line {line}: {reason}")]
    Csv { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&BandcostError> for std::process::ExitCode {
    fn from(err: &BandcostError) -> Self {
        let code: u8 = match err {
            BandcostError::Io(_) => 1,
            BandcostError::ConfigParse { .. }
            | BandcostError::ConfigMissing { .. }
            | BandcostError::ConfigInvalid { .. } => 2,
            BandcostError::Database { .. } | BandcostError::DatabaseQuery { .. } => 3,
            BandcostError::InvalidTrade(_)
            | BandcostError::InvalidInstrument(_)
            | BandcostError::Csv { .. } => 4,
            BandcostError::Replay(_)
            | BandcostError::DuplicateInstrument { .. }
            | BandcostError::UnknownInstrument { .. }
            | BandcostError::UnknownTrade { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = BandcostError::UnknownInstrument { code: "AAPL".into() };
        assert_eq!(err.to_string(), "unknown instrument AAPL");

        let err = BandcostError::ConfigMissing {
            section: "database".into(),
            key: "path".into(),
        };
        assert_eq!(err.to_string(), "missing config key [database] path");
    }

    #[test]
    fn replay_error_is_transparent() {
        let replay = ReplayError::SellExceedsHoldings {
            code: "AAPL".into(),
            id: 7,
            date: chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            held: 10,
            sold: 20,
        };
        let expected = replay.to_string();
        let err = BandcostError::from(replay);
        assert_eq!(err.to_string(), expected);
    }
}
