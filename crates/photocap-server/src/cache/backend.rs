//! Cache client over Redis, with an in-process fallback.

use dashmap::DashMap;
use deadpool_redis::{Pool, PoolConfig, Runtime};
use photocap_api::ApiError;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RedisConfig;

/// Local entry count at which `set` sweeps expired entries before inserting.
const LOCAL_SWEEP_THRESHOLD: usize = 10_000;

/// Errors from the cache client.
///
/// A failed lookup is never reported as a miss; callers decide whether to
/// bypass the cache or fail.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No connection could be obtained (pool exhausted, refused, timed out).
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// Redis accepted the connection but rejected the command.
    #[error("cache command failed: {0}")]
    Command(String),
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_timeout() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Command(err.to_string())
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        tracing::error!(error = %err, "cache failure");
        ApiError::internal(err.to_string())
    }
}

/// A locally cached entry. Expiry is measured on the tokio clock so tests
/// can pause and advance time.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub expires_at: Instant,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Process-wide cache handle. Cloning is cheap; every clone shares the same
/// pool or map.
///
/// - **Local**: in-process `DashMap`, used when Redis is disabled and in tests
/// - **Redis**: shared Redis through a `deadpool-redis` pool
#[derive(Clone)]
pub enum CacheBackend {
    Local(Arc<DashMap<String, CachedEntry>>),
    Redis { pool: Pool },
}

impl std::fmt::Debug for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mode())
    }
}

impl CacheBackend {
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(DashMap::new()))
    }

    pub fn new_redis(pool: Pool) -> Self {
        CacheBackend::Redis { pool }
    }

    /// Builds the backend described by `config`.
    ///
    /// With Redis enabled, the pool is created and checked with a `PING`;
    /// an unreachable Redis fails startup rather than silently degrading.
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        if !config.enabled {
            tracing::info!("Redis disabled, using local cache only");
            return Ok(Self::new_local());
        }

        tracing::info!(url = %config.url, pool_size = config.pool_size, "Connecting to Redis");

        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(config.timeout());
        pool_config.timeouts.create = Some(config.timeout());
        pool_config.timeouts.recycle = Some(config.timeout());

        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let backend = Self::new_redis(pool);
        backend.ping().await?;
        tracing::info!("Connected to Redis");
        Ok(backend)
    }

    pub fn mode(&self) -> &'static str {
        match self {
            CacheBackend::Local(_) => "local",
            CacheBackend::Redis { .. } => "redis",
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self {
            CacheBackend::Local(map) => {
                if let Some(entry) = map.get(key) {
                    if !entry.is_expired() {
                        return Ok(Some(entry.data.as_ref().clone()));
                    }
                    drop(entry);
                    map.remove(key);
                }
                Ok(None)
            }
            CacheBackend::Redis { pool } => {
                let mut conn = pool.get().await?;
                let value: Option<Vec<u8>> = conn.get(key).await?;
                Ok(value)
            }
        }
    }

    /// `SET key value EX ttl`.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        match self {
            CacheBackend::Local(map) => {
                if map.len() >= LOCAL_SWEEP_THRESHOLD {
                    let removed = self.cleanup_expired();
                    tracing::debug!(removed, remaining = map.len(), "swept local cache");
                }
                map.insert(key.to_string(), CachedEntry::new(value, ttl));
                Ok(())
            }
            CacheBackend::Redis { pool } => {
                let mut conn = pool.get().await?;
                // Redis rejects EX 0
                let ttl_secs = ttl.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
                tracing::debug!(key = %key, ttl_secs, "cache set");
                Ok(())
            }
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            CacheBackend::Local(map) => {
                map.remove(key);
                Ok(())
            }
            CacheBackend::Redis { pool } => {
                let mut conn = pool.get().await?;
                conn.del::<_, ()>(key).await?;
                Ok(())
            }
        }
    }

    /// Drops every key, entity views and tokens alike.
    pub async fn flush_all(&self) -> Result<(), CacheError> {
        match self {
            CacheBackend::Local(map) => {
                map.clear();
                Ok(())
            }
            CacheBackend::Redis { pool } => {
                let mut conn = pool.get().await?;
                let _: () = redis::cmd("FLUSHALL").query_async(&mut conn).await?;
                Ok(())
            }
        }
    }

    /// Readiness probe.
    pub async fn ping(&self) -> Result<(), CacheError> {
        match self {
            CacheBackend::Local(_) => Ok(()),
            CacheBackend::Redis { pool } => {
                let mut conn = pool.get().await?;
                let _: String = redis::cmd("PING").query_async(&mut conn).await?;
                Ok(())
            }
        }
    }

    /// Closes the pool. Only the shutdown path calls this.
    pub fn disconnect(&self) {
        match self {
            CacheBackend::Local(map) => map.clear(),
            CacheBackend::Redis { pool } => {
                pool.close();
                tracing::info!("Redis pool closed");
            }
        }
    }

    /// Drops expired local entries and returns how many were removed.
    ///
    /// Keys that are never read again (expired tokens, stale views) are only
    /// reclaimed here. Redis expires keys itself, so this is a no-op there.
    pub fn cleanup_expired(&self) -> usize {
        match self {
            CacheBackend::Local(map) => {
                let before = map.len();
                map.retain(|_, entry| !entry.is_expired());
                before.saturating_sub(map.len())
            }
            CacheBackend::Redis { .. } => 0,
        }
    }

    /// Sweeps the local cache every `period` until the returned handle is
    /// aborted. Returns `None` for Redis.
    pub fn spawn_sweeper(&self, period: Duration) -> Option<tokio::task::JoinHandle<()>> {
        if matches!(self, CacheBackend::Redis { .. }) {
            return None;
        }
        let cache = self.clone();
        Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tick.tick().await;
            loop {
                tick.tick().await;
                let removed = cache.cleanup_expired();
                if removed > 0 {
                    tracing::debug!(removed, "expired local cache entries");
                }
            }
        }))
    }

    /// Number of live local entries (always 0 for Redis).
    pub fn local_len(&self) -> usize {
        match self {
            CacheBackend::Local(map) => map.iter().filter(|e| !e.is_expired()).count(),
            CacheBackend::Redis { .. } => 0,
        }
    }
}
