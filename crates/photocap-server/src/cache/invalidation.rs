//! Post-commit invalidation of cached views.
//!
//! Each write computes the set of keys that may now be stale (see the
//! `*_keys` functions) from rows read before the mutation, and deletes them
//! once the mutation has succeeded. Deletes are independent and never retried;
//! a failure only leaves a stale entry until its TTL runs out.

use photocap_storage::Caption;
use uuid::Uuid;

use super::backend::CacheBackend;
use super::keys::CacheKey;
use crate::metrics;

#[derive(Debug, Clone)]
pub struct Invalidator {
    backend: CacheBackend,
}

impl Invalidator {
    pub fn new(backend: CacheBackend) -> Self {
        Self { backend }
    }

    /// Deletes every key, logging and counting failures.
    pub async fn invalidate(&self, keys: Vec<CacheKey>) {
        for key in keys {
            let cache_key = key.to_string();
            match self.backend.delete(&cache_key).await {
                Ok(()) => {
                    tracing::debug!(key = %cache_key, "cache entry invalidated");
                    metrics::record_cache_invalidation(key.entity());
                }
                Err(e) => {
                    tracing::error!(key = %cache_key, error = %e, "cache invalidation failed");
                    metrics::record_cache_invalidation_failure(key.entity());
                }
            }
        }
    }
}

/// A new caption changes its author's profile and its photo.
pub fn caption_created_keys(caption: &Caption) -> Vec<CacheKey> {
    dedup([
        CacheKey::User(caption.user_id),
        CacheKey::Photo(caption.photo_id),
    ])
}

/// Updating or deleting a caption also changes its own view.
pub fn caption_changed_keys(caption: &Caption) -> Vec<CacheKey> {
    dedup([
        CacheKey::Caption(caption.id),
        CacheKey::User(caption.user_id),
        CacheKey::Photo(caption.photo_id),
    ])
}

/// Caption views embed the photo.
pub fn photo_updated_keys(photo_id: Uuid, captions: &[Caption]) -> Vec<CacheKey> {
    dedup(
        std::iter::once(CacheKey::Photo(photo_id))
            .chain(captions.iter().map(|c| CacheKey::Caption(c.id))),
    )
}

/// Deleting a photo cascades to its captions, which authors' profiles embed.
pub fn photo_deleted_keys(photo_id: Uuid, captions: &[Caption]) -> Vec<CacheKey> {
    dedup(
        photo_updated_keys(photo_id, captions)
            .into_iter()
            .chain(captions.iter().map(|c| CacheKey::User(c.user_id))),
    )
}

/// Caption views embed the author.
pub fn user_updated_keys(user_id: Uuid, captions: &[Caption]) -> Vec<CacheKey> {
    dedup(
        std::iter::once(CacheKey::User(user_id))
            .chain(captions.iter().map(|c| CacheKey::Caption(c.id))),
    )
}

/// Deleting a user cascades to their captions, which photo views embed.
pub fn user_deleted_keys(user_id: Uuid, captions: &[Caption]) -> Vec<CacheKey> {
    dedup(
        user_updated_keys(user_id, captions)
            .into_iter()
            .chain(captions.iter().map(|c| CacheKey::Photo(c.photo_id))),
    )
}

fn dedup(keys: impl IntoIterator<Item = CacheKey>) -> Vec<CacheKey> {
    let mut out: Vec<CacheKey> = Vec::new();
    for key in keys {
        if !out.contains(&key) {
            out.push(key);
        }
    }
    out
}
