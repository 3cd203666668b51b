//! # Gateway Client
//!
//! The only entry point callers use. Every logical call runs the same
//! pipeline:
//!
//! ```text
//! validate input ─▶ cache lookup ─▶ admission (one token) ─▶ retry loop ─▶ shape check ─▶ cache store
//!                        │ hit                                 │ per attempt:
//!                        ▼                                     ▼ timeout + transport + status check
//!                     payload                              classified failure
//! ```
//!
//! One admission token covers all attempts of a logical call, and a cache hit
//! spends none. A client is meant to be built once and shared (for example
//! behind an `Arc`), since the rate guarantee only holds if all outbound
//! traffic funnels through one bucket.

mod error;
mod payload;

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub use error::{ErrorCategory, GatewayError};

use crate::cache::{CacheMode, CacheStore};
use crate::classify::FailureClassifier;
use crate::config::GatewayConfig;
use crate::domain::{CompanyProfile, Endpoint, HistoricalRange, HistoricalSeries, Quote, Symbol};
use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::throttling::TokenBucket;
use crate::ConfigError;

/// Per-call overrides. The default uses the endpoint's classifier, no
/// cancellation and the shared cache.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Replaces both the endpoint-specific and the default classifier.
    pub classifier: Option<FailureClassifier>,
    pub cancel: Option<CancellationToken>,
    pub cache: CacheMode,
}

impl RequestOptions {
    pub fn with_classifier(mut self, classifier: FailureClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_cache_mode(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }
}

/// Limiter state for health and debug reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LimiterStatus {
    pub tokens: f64,
    pub capacity: u32,
}

/// Builder for [`GatewayClient`], used to inject a transport and
/// endpoint-specific retry classifiers.
pub struct GatewayClientBuilder {
    config: GatewayConfig,
    http: Option<Arc<dyn HttpClient>>,
    classifiers: HashMap<Endpoint, FailureClassifier>,
    jitter_seed: Option<u64>,
}

impl GatewayClientBuilder {
    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Classifier used for `endpoint` unless a call supplies its own.
    pub fn endpoint_classifier(mut self, endpoint: Endpoint, classifier: FailureClassifier) -> Self {
        self.classifiers.insert(endpoint, classifier);
        self
    }

    /// Fixes the jitter source so backoff schedules are reproducible.
    pub fn jitter_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = Some(seed);
        self
    }

    /// Validates the configuration and builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid (a missing API
    /// key included) or the default HTTP client cannot be created.
    pub fn build(self) -> Result<GatewayClient, ConfigError> {
        self.config.validate()?;

        let http = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::new()?),
        };
        let config = self.config;
        let mut retry = RetryPolicy::new(config.backoff_policy());
        retry.jitter_seed = self.jitter_seed;

        Ok(GatewayClient {
            http,
            bucket: TokenBucket::with_poll_interval(
                config.rate_limit.capacity,
                config.rate_limit.refill_rate,
                config.min_poll_interval,
            ),
            retry,
            classifiers: self.classifiers,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key,
            timeout: config.timeout,
            cache: CacheStore::new(config.cache_ttl),
        })
    }
}

/// Rate-limited, retrying client for the market data provider.
pub struct GatewayClient {
    http: Arc<dyn HttpClient>,
    bucket: TokenBucket,
    retry: RetryPolicy,
    classifiers: HashMap<Endpoint, FailureClassifier>,
    base_url: String,
    api_key: String,
    timeout: Duration,
    cache: CacheStore,
}

impl GatewayClient {
    /// Builds a client over the default reqwest transport.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    pub fn builder(config: GatewayConfig) -> GatewayClientBuilder {
        GatewayClientBuilder {
            config,
            http: None,
            classifiers: HashMap::new(),
            jitter_seed: None,
        }
    }

    /// Latest quote for `symbol`.
    pub async fn quote(&self, symbol: &str) -> Result<Quote, GatewayError> {
        self.quote_with(symbol, &RequestOptions::default()).await
    }

    pub async fn quote_with(
        &self,
        symbol: &str,
        options: &RequestOptions,
    ) -> Result<Quote, GatewayError> {
        let symbol = Symbol::parse(symbol)?;
        self.call(Endpoint::Quote, &symbol, HistoricalRange::all(), options, payload::decode_quote)
            .await
    }

    /// Company profile for `symbol`.
    pub async fn profile(&self, symbol: &str) -> Result<CompanyProfile, GatewayError> {
        self.profile_with(symbol, &RequestOptions::default()).await
    }

    pub async fn profile_with(
        &self,
        symbol: &str,
        options: &RequestOptions,
    ) -> Result<CompanyProfile, GatewayError> {
        let symbol = Symbol::parse(symbol)?;
        self.call(
            Endpoint::Profile,
            &symbol,
            HistoricalRange::all(),
            options,
            payload::decode_profile,
        )
        .await
    }

    /// Daily price history for `symbol`, newest first, bounded by `range`.
    pub async fn historical(
        &self,
        symbol: &str,
        range: HistoricalRange,
    ) -> Result<HistoricalSeries, GatewayError> {
        self.historical_with(symbol, range, &RequestOptions::default())
            .await
    }

    pub async fn historical_with(
        &self,
        symbol: &str,
        range: HistoricalRange,
        options: &RequestOptions,
    ) -> Result<HistoricalSeries, GatewayError> {
        let symbol = Symbol::parse(symbol)?;
        self.call(
            Endpoint::Historical,
            &symbol,
            range,
            options,
            payload::decode_historical,
        )
        .await
    }

    /// Token count and capacity. Refills lazily but never consumes admission.
    pub fn limiter_status(&self) -> LimiterStatus {
        let snapshot = self.bucket.snapshot();
        LimiterStatus {
            tokens: snapshot.tokens,
            capacity: snapshot.capacity,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    async fn call<T, D>(
        &self,
        endpoint: Endpoint,
        symbol: &Symbol,
        range: HistoricalRange,
        options: &RequestOptions,
        decode: D,
    ) -> Result<T, GatewayError>
    where
        D: Fn(&str) -> payload::Decoded<T>,
    {
        let span = tracing::debug_span!(
            "gateway_call",
            endpoint = %endpoint,
            symbol = %symbol,
            range = %range,
            request_id = %uuid::Uuid::new_v4(),
        );
        self.run_call(endpoint, symbol, range, options, decode)
            .instrument(span)
            .await
    }

    async fn run_call<T, D>(
        &self,
        endpoint: Endpoint,
        symbol: &Symbol,
        range: HistoricalRange,
        options: &RequestOptions,
        decode: D,
    ) -> Result<T, GatewayError>
    where
        D: Fn(&str) -> payload::Decoded<T>,
    {
        let cache_key = cache_key(endpoint, symbol, &range);
        if options.cache.reads() {
            if let Some(body) = self.cache.get(&cache_key).await {
                if let Ok(Some(value)) = decode(&body) {
                    tracing::debug!("served from cache");
                    return Ok(value);
                }
            }
        }

        match &options.cancel {
            Some(cancel) => self
                .bucket
                .wait_and_consume_cancellable(cancel)
                .await
                .map_err(|_| GatewayError::Cancelled {
                    endpoint,
                    attempts: 0,
                })?,
            None => self.bucket.wait_and_consume().await,
        }

        let policy = RetryPolicy {
            classifier: self.classifier_for(endpoint, options),
            ..self.retry.clone()
        };
        let mut executor = RetryExecutor::new(&policy);
        if let Some(cancel) = &options.cancel {
            executor = executor.with_cancellation(cancel);
        }

        let request = self.build_request(endpoint, symbol, &range);
        let outcome = executor
            .run(|| self.attempt(request.clone()))
            .await
            .map_err(|error| GatewayError::from_retry(endpoint, error))?;

        let body = outcome.value.body;
        match decode(&body) {
            Ok(Some(value)) => {
                tracing::debug!(
                    attempts = outcome.attempts_made,
                    total_delay_ms = outcome.total_delay.as_millis() as u64,
                    "call completed"
                );
                if options.cache.writes() {
                    self.cache.put(cache_key, body).await;
                }
                Ok(value)
            }
            Ok(None) => {
                tracing::warn!(attempts = outcome.attempts_made, "no data for symbol");
                Err(GatewayError::NotFound {
                    endpoint,
                    symbol: symbol.to_string(),
                })
            }
            Err(message) => {
                tracing::debug!(%message, "rejecting malformed payload");
                Err(GatewayError::MalformedPayload { endpoint, message })
            }
        }
    }

    fn classifier_for(&self, endpoint: Endpoint, options: &RequestOptions) -> FailureClassifier {
        options
            .classifier
            .clone()
            .or_else(|| self.classifiers.get(&endpoint).cloned())
            .unwrap_or_default()
    }

    fn build_request(
        &self,
        endpoint: Endpoint,
        symbol: &Symbol,
        range: &HistoricalRange,
    ) -> HttpRequest {
        let url = format!("{}{}", self.base_url, endpoint.path(symbol));
        let mut request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_timeout(self.timeout);

        if endpoint == Endpoint::Historical {
            for (name, value) in range.query_params() {
                request = request.with_query(name, value);
            }
        }
        request.with_query("apikey", self.api_key.as_str())
    }

    /// One transport attempt, bounded by the per-attempt timeout.
    async fn attempt(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        // `url` carries no query string, so the API key never reaches the log.
        tracing::debug!(url = %request.url, "issuing upstream request");
        let budget = request.timeout;

        let response = match tokio::time::timeout(budget, self.http.execute(request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(HttpError::timeout(format!(
                    "attempt exceeded {} ms",
                    budget.as_millis()
                )))
            }
        };

        tracing::debug!(status = response.status, "upstream responded");
        response.error_for_status()
    }
}

impl Debug for GatewayClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn cache_key(endpoint: Endpoint, symbol: &Symbol, range: &HistoricalRange) -> String {
    let mut key = format!("{endpoint}:{symbol}");
    for (name, value) in range.query_params() {
        key.push(':');
        key.push_str(name);
        key.push('=');
        key.push_str(&value);
    }
    key
}
