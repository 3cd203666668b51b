//! Retry classification of transport failures.
//!
//! | Failure | Class |
//! |---------|-------|
//! | no response (timeout, connect, network) | retryable |
//! | status `5xx` | retryable |
//! | status `429` | retryable |
//! | any other `4xx` | terminal |
//! | anything else | terminal |
//!
//! Unknown shapes fail closed: they are never retried.

use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use crate::http_client::{HttpError, HttpErrorKind};

/// Why a failure landed in its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The upstream never answered.
    NoResponse,
    ServerError(u16),
    RateLimited,
    ClientError(u16),
    /// Status outside 4xx/5xx, or a request that could not be sent as built.
    Unrecognized,
    /// Decided by a call-site predicate rather than the default table.
    CustomPolicy,
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoResponse => f.write_str("no response from upstream"),
            Self::ServerError(status) => write!(f, "server error {status}"),
            Self::RateLimited => f.write_str("upstream rate limit (429)"),
            Self::ClientError(status) => write!(f, "client error {status}"),
            Self::Unrecognized => f.write_str("unrecognized failure"),
            Self::CustomPolicy => f.write_str("call-site retry policy"),
        }
    }
}

/// Outcome of classifying one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Retryable(FailureReason),
    Terminal(FailureReason),
}

impl FailureClass {
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    pub const fn reason(self) -> FailureReason {
        match self {
            Self::Retryable(reason) | Self::Terminal(reason) => reason,
        }
    }
}

type RetryPredicate = dyn Fn(&HttpError) -> bool + Send + Sync;

/// Decides whether a failed attempt is worth another try.
///
/// Cheap to clone; a custom predicate is shared behind an `Arc`.
#[derive(Clone, Default)]
pub enum FailureClassifier {
    #[default]
    Default,
    Predicate(Arc<RetryPredicate>),
}

impl FailureClassifier {
    /// Wrap a call-site predicate returning `true` for retryable failures.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&HttpError) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    pub fn classify(&self, failure: &HttpError) -> FailureClass {
        match self {
            Self::Default => classify_default(failure),
            Self::Predicate(predicate) => {
                if predicate(failure) {
                    FailureClass::Retryable(FailureReason::CustomPolicy)
                } else {
                    FailureClass::Terminal(FailureReason::CustomPolicy)
                }
            }
        }
    }
}

impl Debug for FailureClassifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => f.write_str("FailureClassifier::Default"),
            Self::Predicate(_) => f.write_str("FailureClassifier::Predicate(..)"),
        }
    }
}

/// The default retry table.
pub fn classify_default(failure: &HttpError) -> FailureClass {
    match failure.kind() {
        HttpErrorKind::Timeout | HttpErrorKind::Connect | HttpErrorKind::Network => {
            FailureClass::Retryable(FailureReason::NoResponse)
        }
        HttpErrorKind::Status => match failure.status_code() {
            Some(429) => FailureClass::Retryable(FailureReason::RateLimited),
            Some(status @ 500..=599) => FailureClass::Retryable(FailureReason::ServerError(status)),
            Some(status @ 400..=499) => FailureClass::Terminal(FailureReason::ClientError(status)),
            _ => FailureClass::Terminal(FailureReason::Unrecognized),
        },
        HttpErrorKind::Protocol => FailureClass::Terminal(FailureReason::Unrecognized),
    }
}
