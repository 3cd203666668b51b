//! # Ferrogate Core
//!
//! Admission-controlled, retrying client for a quota-bound market data
//! provider.
//!
//! ## Overview
//!
//! Every outbound call goes through the same two gates, in a fixed order:
//!
//! - **Admission**: one token from a shared [`TokenBucket`] per logical call,
//!   waited for cooperatively
//! - **Attempt with retry**: a bounded [`RetryExecutor`] loop with exponential
//!   backoff and jitter, where each failure is classified once as retryable or
//!   terminal
//!
//! Callers only see [`GatewayClient`] and a classified [`GatewayError`].
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Optional TTL response cache |
//! | [`classify`] | Retryable/terminal failure classification |
//! | [`config`] | Gateway configuration (defaults, JSON file, environment) |
//! | [`domain`] | Symbols, endpoints and payload models |
//! | [`error`] | Validation and configuration errors |
//! | [`gateway`] | The client callers interact with |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`retry`] | Backoff policy and retry executor |
//! | [`throttling`] | Token bucket admission control |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrogate_core::{GatewayClient, GatewayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GatewayClient::new(GatewayConfig::from_env()?)?;
//!
//!     let quote = client.quote("AAPL").await?;
//!     println!("AAPL price: ${:.2}", quote.price);
//!
//!     let status = client.limiter_status();
//!     println!("{}/{} tokens left", status.tokens, status.capacity);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use ferrogate_core::{ErrorCategory, GatewayError};
//!
//! fn handle_error(error: &GatewayError) {
//!     match error.category() {
//!         ErrorCategory::NotFound => {
//!             // Unknown symbol; nothing to retry
//!         }
//!         ErrorCategory::UpstreamUnavailable => {
//!             // Transient outage outlived the retry budget
//!         }
//!         ErrorCategory::RequestRejected => {
//!             // Inspect error.status()
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The API key is sent as a query parameter and never logged
//! - Symbols and date ranges are validated before any token is spent

pub mod cache;
pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod http_client;
pub mod retry;
pub mod throttling;

// Caching
pub use cache::{CacheMode, CacheStore};

// Failure classification
pub use classify::{classify_default, FailureClass, FailureClassifier, FailureReason};

// Configuration
pub use config::{ConfigFile, GatewayConfig, RateLimitConfig, RetryConfig};

// Domain models
pub use domain::{
    CompanyProfile, Endpoint, HistoricalBar, HistoricalRange, HistoricalSeries, Quote, Symbol,
};

// Error types
pub use error::{ConfigError, ValidationError};

// Gateway
pub use gateway::{
    ErrorCategory, GatewayClient, GatewayClientBuilder, GatewayError, LimiterStatus,
    RequestOptions,
};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Retry logic
pub use retry::{BackoffPolicy, RetryError, RetryExecutor, RetryOutcome, RetryPolicy};

// Throttling
pub use throttling::{AdmissionCancelled, BucketSnapshot, TokenBucket, DEFAULT_MIN_POLL_INTERVAL};

// Cancellation handle accepted by `RequestOptions`
pub use tokio_util::sync::CancellationToken;
