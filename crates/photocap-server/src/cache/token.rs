//! Live bearer tokens.
//!
//! A token is either absent or live. Login makes it live for the token TTL,
//! logout makes it absent immediately, and expiry is left to the cache.

use std::time::Duration;

use super::backend::{CacheBackend, CacheError};
use super::keys::token_key;

const LIVE: &[u8] = b"1";

#[derive(Debug, Clone)]
pub struct TokenStore {
    backend: CacheBackend,
    ttl: Duration,
}

impl TokenStore {
    pub fn new(backend: CacheBackend, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// Marks `token` live. Re-issuing resets the TTL.
    pub async fn issue(&self, token: &str) -> Result<(), CacheError> {
        self.backend
            .set(&token_key(token), LIVE.to_vec(), self.ttl)
            .await
    }

    /// Whether `token` is currently live. A cache failure is an error, never
    /// "not live".
    pub async fn is_live(&self, token: &str) -> Result<bool, CacheError> {
        Ok(self.backend.get(&token_key(token)).await?.is_some())
    }

    pub async fn revoke(&self, token: &str) -> Result<(), CacheError> {
        self.backend.delete(&token_key(token)).await
    }
}
