//! Cache key namespace.
//!
//! Entity views live under `<entity>_<id>` and live tokens under
//! `token_<jwt>`. A JWT always contains dots, an id never does, so the two
//! namespaces cannot collide.

use std::fmt;

use uuid::Uuid;

/// Key of a cached single-entity view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    User(Uuid),
    Photo(Uuid),
    Caption(Uuid),
}

impl CacheKey {
    /// Entity name, also used as the metrics label.
    pub fn entity(&self) -> &'static str {
        match self {
            CacheKey::User(_) => "user",
            CacheKey::Photo(_) => "photo",
            CacheKey::Caption(_) => "caption",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            CacheKey::User(id) | CacheKey::Photo(id) | CacheKey::Caption(id) => *id,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.entity(), self.id())
    }
}

pub fn token_key(token: &str) -> String {
    format!("token_{token}")
}
