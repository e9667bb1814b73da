//! Photocap server: a photo caption contest API with a Redis read-through
//! cache in front of the primary store.

pub mod cache;
pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod services;

pub use cache::{CacheBackend, CacheError, CacheKey, Invalidator, ReadThroughCache, TokenStore};
pub use config::{AppConfig, CacheConfig, CacheErrorPolicy, RedisConfig, ServerConfig};
pub use observability::init_tracing;
pub use server::{AppState, PhotocapServer, ServerBuilder, build_app, create_store};
