//! In-memory TTL cache for validated upstream payloads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Per-call cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Serve a fresh entry if present; otherwise fetch and store. (Default)
    #[default]
    Use,
    /// Always fetch, then overwrite the entry.
    Refresh,
    /// Fetch without reading or writing the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
    ttl: Duration,
}

/// Thread-safe response cache keyed by request identity.
///
/// A zero TTL disables the cache entirely.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
                ttl,
            })),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Fresh body for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<String> {
        let store = self.inner.read().await;
        store
            .map
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.body.clone())
    }

    /// No-op while the cache is disabled.
    pub async fn put(&self, key: String, body: String) {
        let mut store = self.inner.write().await;
        if store.ttl.is_zero() {
            return;
        }
        let expires_at = Instant::now() + store.ttl;
        store.map.insert(key, CacheEntry { body, expires_at });
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.inner.write().await.map.remove(key).is_some()
    }

    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.inner
            .write()
            .await
            .map
            .retain(|_, entry| entry.expires_at > now);
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    /// Number of entries, including expired ones not yet pruned.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_disabled(&self) -> bool {
        self.inner.read().await.ttl.is_zero()
    }
}
