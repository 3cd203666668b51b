//! Token bucket admission control.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Lower bound on the sleep between admission polls.
pub const DEFAULT_MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Returned when a caller gave up waiting for admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionCancelled;

/// Point-in-time view of the bucket for health and debug output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketSnapshot {
    pub tokens: f64,
    pub capacity: u32,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Capped pool of admission tokens refilled continuously at a fixed rate.
///
/// The bucket starts full. Refill happens lazily at the start of every
/// consume or inspect call and only in whole tokens: the refill clock is
/// advanced only when at least one token was credited, so fractional
/// progress between polls is never discarded.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    refill_rate: f64,
    min_poll_interval: Duration,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// `capacity` must be at least 1 and `refill_rate` (tokens per second)
    /// finite and positive; [`GatewayConfig::validate`](crate::GatewayConfig::validate)
    /// enforces both before a bucket is built from configuration.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self::with_poll_interval(capacity, refill_rate, DEFAULT_MIN_POLL_INTERVAL)
    }

    pub fn with_poll_interval(capacity: u32, refill_rate: f64, min_poll_interval: Duration) -> Self {
        Self {
            capacity,
            refill_rate,
            min_poll_interval,
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Refills, then takes one token if available. Never blocks.
    pub fn try_consume(&self) -> bool {
        let mut state = self.lock_state();
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Suspends the caller until one token has been consumed.
    pub async fn wait_and_consume(&self) {
        while !self.try_consume() {
            tracing::trace!(
                wait_ms = self.poll_interval().as_millis() as u64,
                "admission token unavailable; polling"
            );
            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    /// Like [`wait_and_consume`](Self::wait_and_consume) but gives up as soon
    /// as `cancel` fires. A cancelled wait never consumes a token.
    pub async fn wait_and_consume_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), AdmissionCancelled> {
        loop {
            if cancel.is_cancelled() {
                return Err(AdmissionCancelled);
            }
            if self.try_consume() {
                return Ok(());
            }
            tokio::select! {
                () = tokio::time::sleep(self.poll_interval()) => {}
                () = cancel.cancelled() => return Err(AdmissionCancelled),
            }
        }
    }

    /// Current token count after a lazy refill.
    ///
    /// Observability only: the refill side effect is intentional, but callers
    /// must not use the value to decide whether to issue a request.
    pub fn current_token_count(&self) -> f64 {
        let mut state = self.lock_state();
        self.refill(&mut state);
        state.tokens
    }

    pub fn snapshot(&self) -> BucketSnapshot {
        BucketSnapshot {
            tokens: self.current_token_count(),
            capacity: self.capacity,
        }
    }

    /// Sleep between polls: one refill period, floored at the minimum poll interval.
    ///
    /// A period too long to represent (tiny, zero or NaN rate) saturates to
    /// [`Duration::MAX`]; such a bucket never refills.
    pub fn poll_interval(&self) -> Duration {
        let period = Duration::try_from_secs_f64(1.0 / self.refill_rate).unwrap_or(Duration::MAX);
        period.max(self.min_poll_interval)
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill);
        let tokens_to_add = (elapsed.as_secs_f64() * self.refill_rate).floor();

        if tokens_to_add > 0.0 {
            state.tokens = (state.tokens + tokens_to_add).min(f64::from(self.capacity));
            state.last_refill = now;
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BucketState> {
        self.state
            .lock()
            .expect("token bucket lock is not poisoned")
    }
}
