//! Redis-backed caching.
//!
//! - [`backend`]: the cache client ([`CacheBackend`]), Redis or in-process
//! - [`read_through`]: cache-aside reads of user/photo/caption views
//! - [`token`]: live bearer tokens
//! - [`invalidation`]: post-commit deletes of stale views

pub mod backend;
pub mod invalidation;
pub mod keys;
pub mod read_through;
pub mod token;

pub use backend::{CacheBackend, CacheError, CachedEntry};
pub use invalidation::Invalidator;
pub use keys::{CacheKey, token_key};
pub use read_through::ReadThroughCache;
pub use token::TokenStore;
