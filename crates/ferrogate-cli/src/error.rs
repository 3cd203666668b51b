use ferrogate_core::{ErrorCategory, GatewayError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ferrogate_core::ValidationError),

    #[error(transparent)]
    Config(#[from] ferrogate_core::ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) => 2,
            Self::Gateway(error) => gateway_exit_code(error.category()),
            Self::Serialization(_) | Self::Io(_) | Self::Task(_) => 10,
        }
    }
}

pub const fn gateway_exit_code(category: ErrorCategory) -> u8 {
    match category {
        ErrorCategory::InvalidInput => 2,
        ErrorCategory::NotFound => 3,
        ErrorCategory::RequestRejected | ErrorCategory::MalformedPayload => 4,
        ErrorCategory::UpstreamUnavailable => 5,
        ErrorCategory::Cancelled => 6,
    }
}
