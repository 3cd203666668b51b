use std::fmt::{Display, Formatter};

use serde::Serialize;
use thiserror::Error;

use crate::classify::FailureReason;
use crate::domain::Endpoint;
use crate::retry::RetryError;
use crate::ValidationError;

/// Stable category of a [`GatewayError`], suitable for matching and for
/// machine-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    NotFound,
    UpstreamUnavailable,
    RequestRejected,
    MalformedPayload,
    Cancelled,
    InvalidInput,
}

impl ErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::RequestRejected => "request_rejected",
            Self::MalformedPayload => "malformed_payload",
            Self::Cancelled => "cancelled",
            Self::InvalidInput => "invalid_input",
        }
    }
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing failure of one logical gateway call.
///
/// Every variant is classified once, where it occurred; the upstream status
/// and the number of transport attempts are preserved where they exist.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The upstream answered successfully but had nothing for this symbol.
    #[error("{endpoint} for {symbol} not found")]
    NotFound { endpoint: Endpoint, symbol: String },

    /// Retryable failures persisted past the attempt budget.
    #[error("upstream unavailable for {endpoint} after {attempts} attempt(s): {message}")]
    UpstreamUnavailable {
        endpoint: Endpoint,
        attempts: u32,
        status: Option<u16>,
        status_text: Option<String>,
        message: String,
    },

    /// The upstream refused the request, or failed in a way that is never retried.
    #[error("{endpoint} request rejected ({reason}): {message}")]
    RequestRejected {
        endpoint: Endpoint,
        status: Option<u16>,
        status_text: Option<String>,
        reason: FailureReason,
        attempts: u32,
        message: String,
    },

    #[error("malformed {endpoint} payload: {message}")]
    MalformedPayload { endpoint: Endpoint, message: String },

    #[error("{endpoint} call cancelled after {attempts} attempt(s)")]
    Cancelled { endpoint: Endpoint, attempts: u32 },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl GatewayError {
    pub(crate) fn from_retry(endpoint: Endpoint, error: RetryError) -> Self {
        match error {
            RetryError::Terminal {
                failure,
                reason,
                attempts_made,
            } => Self::RequestRejected {
                endpoint,
                status: failure.status_code(),
                status_text: failure.status_text().map(str::to_owned),
                reason,
                attempts: attempts_made,
                message: failure.message().to_owned(),
            },
            RetryError::Exhausted {
                failure,
                attempts_made,
                ..
            } => Self::UpstreamUnavailable {
                endpoint,
                attempts: attempts_made,
                status: failure.status_code(),
                status_text: failure.status_text().map(str::to_owned),
                message: failure.message().to_owned(),
            },
            RetryError::Cancelled { attempts_made, .. } => Self::Cancelled {
                endpoint,
                attempts: attempts_made,
            },
        }
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::UpstreamUnavailable { .. } => ErrorCategory::UpstreamUnavailable,
            Self::RequestRejected { .. } => ErrorCategory::RequestRejected,
            Self::MalformedPayload { .. } => ErrorCategory::MalformedPayload,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
            Self::Validation(_) => ErrorCategory::InvalidInput,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self.category() {
            ErrorCategory::NotFound => "gateway.not_found",
            ErrorCategory::UpstreamUnavailable => "gateway.upstream_unavailable",
            ErrorCategory::RequestRejected => "gateway.request_rejected",
            ErrorCategory::MalformedPayload => "gateway.malformed_payload",
            ErrorCategory::Cancelled => "gateway.cancelled",
            ErrorCategory::InvalidInput => "gateway.invalid_input",
        }
    }

    /// Upstream HTTP status, when one was received.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamUnavailable { status, .. } | Self::RequestRejected { status, .. } => {
                *status
            }
            _ => None,
        }
    }

    /// Transport attempts made for this call. Zero when no attempt was issued.
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::UpstreamUnavailable { attempts, .. }
            | Self::RequestRejected { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
            // The payload was judged after exactly one successful exchange.
            Self::NotFound { .. } | Self::MalformedPayload { .. } => 1,
            Self::Validation(_) => 0,
        }
    }

    pub const fn endpoint(&self) -> Option<Endpoint> {
        match self {
            Self::NotFound { endpoint, .. }
            | Self::UpstreamUnavailable { endpoint, .. }
            | Self::RequestRejected { endpoint, .. }
            | Self::MalformedPayload { endpoint, .. }
            | Self::Cancelled { endpoint, .. } => Some(*endpoint),
            Self::Validation(_) => None,
        }
    }
}
