//! In-memory primary store for Photocap.
//!
//! Used for local development and for the HTTP integration tests. Data does
//! not survive a restart.
//!
//! ```ignore
//! use std::sync::Arc;
//! use photocap_db_memory::InMemoryStore;
//! use photocap_storage::DynPrimaryStore;
//!
//! let store: DynPrimaryStore = Arc::new(InMemoryStore::new());
//! ```

mod storage;

pub use storage::InMemoryStore;

/// Creates a new, empty in-memory primary store.
pub fn create_primary_store() -> photocap_storage::DynPrimaryStore {
    std::sync::Arc::new(InMemoryStore::new())
}
