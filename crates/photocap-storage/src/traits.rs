//! Primary store traits.
//!
//! The primary store is the source of truth for users, photos and captions.
//! Implementations must be thread-safe (`Send + Sync`) and must enforce:
//!
//! - unique user email and unique photo url (`StorageError::Conflict`)
//! - caption foreign keys (`StorageError::ForeignKey`)
//! - cascading deletion of captions when their user or photo is deleted
//! - list queries ordered newest first

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::types::{
    Caption, CaptionDetail, NewCaption, NewPhoto, NewUser, Photo, PhotoChanges, PhotoDetail,
    User, UserChanges, UserCredentials, UserProfile,
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users, newest first.
    async fn list_users(&self) -> StorageResult<Vec<User>>;

    async fn find_user(&self, id: Uuid) -> StorageResult<Option<User>>;

    /// Looks up the login credentials for an email address.
    async fn find_user_by_email(&self, email: &str)
    -> StorageResult<Option<UserCredentials>>;

    /// The user with their captions eagerly loaded.
    async fn user_profile(&self, id: Uuid) -> StorageResult<Option<UserProfile>>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is already registered.
    async fn create_user(&self, new: NewUser) -> StorageResult<User>;

    /// Applies the changes and returns the updated row, or `None` if the user
    /// does not exist.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StorageResult<Option<User>>;

    /// Deletes the user and their captions. Returns `false` if nothing was deleted.
    async fn delete_user(&self, id: Uuid) -> StorageResult<bool>;
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// All photos, newest first.
    async fn list_photos(&self) -> StorageResult<Vec<Photo>>;

    async fn find_photo(&self, id: Uuid) -> StorageResult<Option<Photo>>;

    /// The photo with its captions eagerly loaded.
    async fn photo_detail(&self, id: Uuid) -> StorageResult<Option<PhotoDetail>>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the url is already used by another photo.
    async fn create_photo(&self, new: NewPhoto) -> StorageResult<Photo>;

    async fn update_photo(&self, id: Uuid, changes: PhotoChanges) -> StorageResult<Option<Photo>>;

    /// Deletes the photo and its captions. Returns `false` if nothing was deleted.
    async fn delete_photo(&self, id: Uuid) -> StorageResult<bool>;
}

#[async_trait]
pub trait CaptionStore: Send + Sync {
    async fn find_caption(&self, id: Uuid) -> StorageResult<Option<Caption>>;

    /// The caption with its author and photo eagerly loaded.
    async fn caption_detail(&self, id: Uuid) -> StorageResult<Option<CaptionDetail>>;

    async fn captions_by_user(&self, user_id: Uuid) -> StorageResult<Vec<Caption>>;

    async fn captions_by_photo(&self, photo_id: Uuid) -> StorageResult<Vec<Caption>>;

    /// # Errors
    ///
    /// Returns `StorageError::ForeignKey` if the user or photo does not exist.
    async fn create_caption(&self, new: NewCaption) -> StorageResult<Caption>;

    async fn update_caption(&self, id: Uuid, comment: String) -> StorageResult<Option<Caption>>;

    async fn delete_caption(&self, id: Uuid) -> StorageResult<bool>;
}

/// The complete primary store contract consumed by the server.
#[async_trait]
pub trait PrimaryStore: UserStore + PhotoStore + CaptionStore {
    /// Verifies the store is reachable.
    async fn health_check(&self) -> StorageResult<()>;

    /// Short backend name for logs (`postgres`, `memory`).
    fn backend_name(&self) -> &'static str;
}
