//! # photocap-storage
//!
//! Primary store abstraction for the Photocap server.
//!
//! This crate defines the traits and types every primary store backend
//! implements. It does not contain any implementations; those live in
//! `photocap-db-postgres` and `photocap-db-memory`.
//!
//! ## Example
//!
//! ```ignore
//! use photocap_storage::{DynPrimaryStore, StorageError};
//!
//! async fn photo_name(store: &DynPrimaryStore, id: uuid::Uuid) -> Result<String, StorageError> {
//!     store
//!         .find_photo(id)
//!         .await?
//!         .map(|p| p.name)
//!         .ok_or_else(|| StorageError::not_found("photo", id))
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError, StorageResult};
pub use traits::{CaptionStore, PhotoStore, PrimaryStore, UserStore};
pub use types::{
    Caption, CaptionAuthor, CaptionDetail, CaptionPhoto, NewCaption, NewPhoto, NewUser, Photo,
    PhotoCaption, PhotoChanges, PhotoDetail, User, UserCaption, UserChanges, UserCredentials,
    UserProfile,
};

/// Type alias for a shareable primary store instance.
pub type DynPrimaryStore = std::sync::Arc<dyn PrimaryStore>;
