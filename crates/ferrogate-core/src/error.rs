use std::path::PathBuf;

use thiserror::Error;

/// Input validation errors raised before any upstream call is attempted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("date must be formatted as YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("range start {from} is after range end {to}")]
    InvertedRange { from: String, to: String },
}

/// Construction-time configuration failures.
///
/// These are raised by [`GatewayConfig::validate`](crate::GatewayConfig::validate)
/// and by client construction, before any call is served.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("FMP_API_KEY is required but was not provided")]
    MissingApiKey,

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
