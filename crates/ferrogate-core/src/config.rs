//! Gateway configuration.
//!
//! Every field is resolved once, at startup, in this order:
//!
//! 1. built-in defaults ([`GatewayConfig::new`])
//! 2. an optional JSON file ([`ConfigFile`])
//! 3. environment variables (`FMP_API_KEY`, `FERROGATE_BASE_URL`)
//!
//! The result is validated before a client is built from it, so a missing
//! credential fails at construction rather than on the first call.

use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::retry::BackoffPolicy;
use crate::throttling::DEFAULT_MIN_POLL_INTERVAL;
use crate::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/api";
pub const API_KEY_ENV: &str = "FMP_API_KEY";
pub const BASE_URL_ENV: &str = "FERROGATE_BASE_URL";

/// Token bucket sizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Maximum burst.
    pub capacity: u32,
    /// Tokens added per second.
    pub refill_rate: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_rate: 2.0,
        }
    }
}

/// Retry schedule applied to every logical call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let backoff = BackoffPolicy::default();
        Self {
            max_attempts: backoff.max_attempts,
            base_delay: backoff.base_delay,
            max_delay: backoff.max_delay,
            backoff_multiplier: backoff.multiplier,
            jitter: backoff.jitter,
        }
    }
}

impl From<RetryConfig> for BackoffPolicy {
    fn from(value: RetryConfig) -> Self {
        Self {
            max_attempts: value.max_attempts,
            base_delay: value.base_delay,
            max_delay: value.max_delay,
            multiplier: value.backoff_multiplier,
            jitter: value.jitter,
        }
    }
}

/// Fully populated gateway configuration.
#[derive(Clone, PartialEq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    /// Budget for a single transport attempt.
    pub timeout: Duration,
    /// Response cache lifetime; zero disables caching.
    pub cache_ttl: Duration,
    pub min_poll_interval: Duration,
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            api_key: api_key.into(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            timeout: Duration::from_millis(10_000),
            cache_ttl: Duration::ZERO,
            min_poll_interval: DEFAULT_MIN_POLL_INTERVAL,
        }
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None, |key| std::env::var(key).ok())
    }

    /// Defaults, then `path` (if any), then whatever `lookup` returns for the
    /// known environment variables. The result is validated.
    pub fn load<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(String::new());
        if let Some(path) = path {
            ConfigFile::read(path)?.apply(&mut config);
        }
        config.apply_env(lookup);
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(api_key) = non_empty(API_KEY_ENV) {
            self.api_key = api_key.trim().to_owned();
        }
        if let Some(base_url) = non_empty(BASE_URL_ENV) {
            self.base_url = base_url.trim().to_owned();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("base_url", "must not be empty"));
        }
        if self.rate_limit.capacity == 0 {
            return Err(ConfigError::invalid("rate_limit.capacity", "must be at least 1"));
        }
        let refill_rate = self.rate_limit.refill_rate;
        if !refill_rate.is_finite() || refill_rate <= 0.0 {
            return Err(ConfigError::invalid(
                "rate_limit.refill_rate",
                format!("must be a positive number, got {refill_rate}"),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier <= 1.0 {
            return Err(ConfigError::invalid(
                "retry.backoff_multiplier",
                format!("must be greater than 1, got {multiplier}"),
            ));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(ConfigError::invalid(
                "retry.base_delay",
                "must not exceed retry.max_delay",
            ));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid("timeout", "must be greater than zero"));
        }
        Ok(())
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        self.retry.into()
    }
}

impl Debug for GatewayConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("rate_limit", &self.rate_limit)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .field("min_poll_interval", &self.min_poll_interval)
            .finish()
    }
}

/// Partial configuration as written in a JSON file. Absent keys keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, alias = "baseURL")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitFile>,
    #[serde(default)]
    pub retry: Option<RetryFile>,
    #[serde(default, alias = "timeout")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub cache_ttl_ms: Option<u64>,
    #[serde(default)]
    pub min_poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RateLimitFile {
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub refill_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RetryFile {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default, alias = "baseDelay")]
    pub base_delay_ms: Option<u64>,
    #[serde(default, alias = "maxDelay")]
    pub max_delay_ms: Option<u64>,
    #[serde(default)]
    pub backoff_multiplier: Option<f64>,
    #[serde(default)]
    pub jitter: Option<bool>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply(self, config: &mut GatewayConfig) {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }
        if let Some(rate_limit) = self.rate_limit {
            if let Some(capacity) = rate_limit.capacity {
                config.rate_limit.capacity = capacity;
            }
            if let Some(refill_rate) = rate_limit.refill_rate {
                config.rate_limit.refill_rate = refill_rate;
            }
        }
        if let Some(retry) = self.retry {
            if let Some(max_attempts) = retry.max_attempts {
                config.retry.max_attempts = max_attempts;
            }
            if let Some(base_delay_ms) = retry.base_delay_ms {
                config.retry.base_delay = Duration::from_millis(base_delay_ms);
            }
            if let Some(max_delay_ms) = retry.max_delay_ms {
                config.retry.max_delay = Duration::from_millis(max_delay_ms);
            }
            if let Some(multiplier) = retry.backoff_multiplier {
                config.retry.backoff_multiplier = multiplier;
            }
            if let Some(jitter) = retry.jitter {
                config.retry.jitter = jitter;
            }
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(cache_ttl_ms) = self.cache_ttl_ms {
            config.cache_ttl = Duration::from_millis(cache_ttl_ms);
        }
        if let Some(min_poll_interval_ms) = self.min_poll_interval_ms {
            config.min_poll_interval = Duration::from_millis(min_poll_interval_ms);
        }
    }
}
