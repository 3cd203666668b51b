//! Retry logic with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::classify::{FailureClassifier, FailureReason};
use crate::http_client::HttpError;

/// Exponential backoff schedule for one logical call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Total attempts including the first one. At least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Growth factor between consecutive delays. Greater than 1.
    pub multiplier: f64,
    /// Scale each delay by a uniform factor in `[0.5, 1.0]`.
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(10_000),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl BackoffPolicy {
    /// Pre-jitter delay after failed attempt `attempt` (1-based):
    /// `min(base_delay * multiplier^(attempt - 1), max_delay)`.
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.base_delay.as_nanos() as f64 * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_nanos() as f64);
        Duration::from_nanos(capped.round() as u64)
    }

    /// Delay to wait before attempt `attempt + 1`.
    ///
    /// With jitter enabled the nominal delay is scaled by a factor drawn from
    /// `rng`, so a seeded generator yields a reproducible schedule.
    pub fn delay_for_attempt(&self, attempt: u32, rng: &mut fastrand::Rng) -> Duration {
        let nominal = self.nominal_delay(attempt);
        if !self.jitter {
            return nominal;
        }
        let factor = 0.5 + rng.f64() * 0.5;
        Duration::from_nanos((nominal.as_nanos() as f64 * factor).round() as u64)
    }
}

/// Everything the executor needs for one logical call.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    pub backoff: BackoffPolicy,
    pub classifier: FailureClassifier,
    /// Seed for the jitter source; `None` draws from entropy.
    pub jitter_seed: Option<u64>,
}

impl RetryPolicy {
    pub fn new(backoff: BackoffPolicy) -> Self {
        Self {
            backoff,
            ..Self::default()
        }
    }

    pub fn with_classifier(mut self, classifier: FailureClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_jitter_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = Some(seed);
        self
    }
}

/// Successful result of a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    pub value: T,
    pub attempts_made: u32,
    /// Sum of the waits between attempts.
    pub total_delay: Duration,
}

/// Failure of a retried operation, classified once where it occurred.
#[derive(Debug, Error)]
pub enum RetryError {
    #[error("terminal failure after {attempts_made} attempt(s) ({reason}): {failure}")]
    Terminal {
        #[source]
        failure: HttpError,
        reason: FailureReason,
        attempts_made: u32,
    },

    #[error("retries exhausted after {attempts_made} attempt(s) ({reason}): {failure}")]
    Exhausted {
        #[source]
        failure: HttpError,
        reason: FailureReason,
        attempts_made: u32,
        total_delay: Duration,
    },

    #[error("cancelled after {attempts_made} attempt(s)")]
    Cancelled {
        attempts_made: u32,
        total_delay: Duration,
    },
}

impl RetryError {
    pub const fn attempts_made(&self) -> u32 {
        match self {
            Self::Terminal { attempts_made, .. }
            | Self::Exhausted { attempts_made, .. }
            | Self::Cancelled { attempts_made, .. } => *attempts_made,
        }
    }

    pub fn failure(&self) -> Option<&HttpError> {
        match self {
            Self::Terminal { failure, .. } | Self::Exhausted { failure, .. } => Some(failure),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Bounded retry loop around one nullary async operation.
///
/// Holds no state across calls; build one per logical call.
#[derive(Debug)]
pub struct RetryExecutor<'a> {
    policy: &'a RetryPolicy,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> RetryExecutor<'a> {
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self {
            policy,
            cancel: None,
        }
    }

    /// Abort the loop (before, during, or between attempts) once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Run `operation` until it succeeds, fails terminally, or runs out of attempts.
    ///
    /// # Errors
    ///
    /// - [`RetryError::Terminal`] as soon as the classifier rejects a failure,
    ///   without waiting.
    /// - [`RetryError::Exhausted`] with the last failure once `max_attempts`
    ///   retryable failures have been seen.
    /// - [`RetryError::Cancelled`] if the cancellation token fires.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<RetryOutcome<T>, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HttpError>>,
    {
        let max_attempts = self.policy.backoff.max_attempts.max(1);
        let mut rng = match self.policy.jitter_seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let mut total_delay = Duration::ZERO;
        let mut attempt: u32 = 1;

        loop {
            let result = match self.cancel {
                Some(cancel) => {
                    if cancel.is_cancelled() {
                        return Err(RetryError::Cancelled {
                            attempts_made: attempt - 1,
                            total_delay,
                        });
                    }
                    tokio::select! {
                        result = operation() => result,
                        () = cancel.cancelled() => {
                            tracing::debug!(attempt, "operation cancelled during attempt");
                            return Err(RetryError::Cancelled { attempts_made: attempt, total_delay });
                        }
                    }
                }
                None => operation().await,
            };

            let failure = match result {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            attempts = attempt,
                            total_delay_ms = total_delay.as_millis() as u64,
                            "retry succeeded"
                        );
                    }
                    return Ok(RetryOutcome {
                        value,
                        attempts_made: attempt,
                        total_delay,
                    });
                }
                Err(failure) => failure,
            };

            let class = self.policy.classifier.classify(&failure);
            if !class.is_retryable() {
                tracing::debug!(
                    attempt,
                    reason = %class.reason(),
                    error = %failure,
                    "not retrying terminal failure"
                );
                return Err(RetryError::Terminal {
                    failure,
                    reason: class.reason(),
                    attempts_made: attempt,
                });
            }

            if attempt >= max_attempts {
                tracing::warn!(
                    attempts = attempt,
                    reason = %class.reason(),
                    error = %failure,
                    "retries exhausted"
                );
                return Err(RetryError::Exhausted {
                    failure,
                    reason: class.reason(),
                    attempts_made: attempt,
                    total_delay,
                });
            }

            let delay = self.policy.backoff.delay_for_attempt(attempt, &mut rng);
            total_delay += delay;
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %class.reason(),
                error = %failure,
                "retrying after failure"
            );

            match self.cancel {
                Some(cancel) => {
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = cancel.cancelled() => {
                            tracing::debug!(attempt, "operation cancelled during retry delay");
                            return Err(RetryError::Cancelled { attempts_made: attempt, total_delay });
                        }
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
            attempt += 1;
        }
    }
}
