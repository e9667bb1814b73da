//! Cache-aside reads of single-entity views.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::backend::{CacheBackend, CacheError};
use super::keys::CacheKey;
use crate::config::CacheErrorPolicy;
use crate::metrics;

/// Returns cached views, loading and populating on a miss.
///
/// There is no single-flight: concurrent misses on one key may each run the
/// loader and each write the result. The last write wins.
#[derive(Debug, Clone)]
pub struct ReadThroughCache {
    backend: CacheBackend,
    ttl: Duration,
    on_error: CacheErrorPolicy,
}

impl ReadThroughCache {
    pub fn new(backend: CacheBackend, ttl: Duration, on_error: CacheErrorPolicy) -> Self {
        Self {
            backend,
            ttl,
            on_error,
        }
    }

    pub fn backend(&self) -> &CacheBackend {
        &self.backend
    }

    /// Returns the view under `key`, calling `loader` on a miss.
    ///
    /// - Hit: the cached JSON is decoded and returned; `loader` is not called.
    ///   An entry that fails to decode is deleted and treated as a miss.
    /// - Miss: `loader` runs. `Some` results are stored with the configured
    ///   TTL; `None` is returned as-is and never cached.
    /// - Cache failure: under [`CacheErrorPolicy::Bypass`] the loader result
    ///   is returned without populating; under [`CacheErrorPolicy::Fail`] the
    ///   error is returned.
    ///
    /// A failure to populate after a successful load is logged and does not
    /// affect the result.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: CacheKey, loader: F) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let entity = key.entity();
        let cache_key = key.to_string();

        match self.backend.get(&cache_key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    tracing::debug!(key = %cache_key, "cache hit");
                    metrics::record_cache_hit(entity);
                    return Ok(Some(value));
                }
                Err(e) => {
                    tracing::warn!(key = %cache_key, error = %e, "dropping undecodable cache entry");
                    if let Err(e) = self.backend.delete(&cache_key).await {
                        tracing::warn!(key = %cache_key, error = %e, "failed to drop cache entry");
                    }
                }
            },
            Ok(None) => {}
            Err(e) => match self.on_error {
                CacheErrorPolicy::Bypass => {
                    tracing::warn!(key = %cache_key, error = %e, "cache unavailable, reading from store");
                    metrics::record_cache_bypass(entity);
                    return loader().await;
                }
                CacheErrorPolicy::Fail => {
                    tracing::error!(key = %cache_key, error = %e, "cache unavailable");
                    return Err(e.into());
                }
            },
        }

        tracing::debug!(key = %cache_key, "cache miss");
        metrics::record_cache_miss(entity);

        let loaded = loader().await?;
        if let Some(value) = &loaded {
            self.populate(&cache_key, entity, value).await;
        }
        Ok(loaded)
    }

    async fn populate<T: Serialize>(&self, cache_key: &str, entity: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(key = %cache_key, error = %e, "failed to encode view for cache");
                metrics::record_cache_populate_failure(entity);
                return;
            }
        };
        if let Err(e) = self.backend.set(cache_key, bytes, self.ttl).await {
            tracing::warn!(key = %cache_key, error = %e, "failed to populate cache");
            metrics::record_cache_populate_failure(entity);
        }
    }
}
