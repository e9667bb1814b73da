//! Request-level operations.
//!
//! Reads of single entities go through the read-through cache. Writes run
//! against the primary store and then invalidate every cached view the
//! change could have made stale. Updates collect the related ids after the
//! write; deletes collect them before, since the cascade removes them.

pub mod captions;
pub mod photos;
pub mod users;

use photocap_api::ApiError;

/// Treats a missing or blank optional field as "leave unchanged".
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn required(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use photocap_storage::{
        Caption, CaptionDetail, CaptionStore, DynPrimaryStore, NewCaption, NewPhoto, NewUser,
        Photo, PhotoChanges, PhotoDetail, PhotoStore, PrimaryStore, StorageResult, User,
        UserChanges, UserCredentials, UserProfile, UserStore,
    };
    use uuid::Uuid;

    use crate::cache::{CacheKey, ReadThroughCache};

    /// Wraps a store so that another client adds a caption, and reads it
    /// into the cache, while a user or photo update is in flight.
    pub(crate) struct ConcurrentCaption {
        inner: DynPrimaryStore,
        views: ReadThroughCache,
        pending: Mutex<Option<NewCaption>>,
        created: Mutex<Option<Uuid>>,
    }

    impl ConcurrentCaption {
        pub(crate) fn new(inner: DynPrimaryStore, views: ReadThroughCache) -> Self {
            Self {
                inner,
                views,
                pending: Mutex::new(None),
                created: Mutex::new(None),
            }
        }

        pub(crate) fn arm(&self, caption: NewCaption) {
            *self.pending.lock().unwrap() = Some(caption);
        }

        pub(crate) fn created(&self) -> Option<Uuid> {
            *self.created.lock().unwrap()
        }

        async fn interleave(&self) {
            let pending = self.pending.lock().unwrap().take();
            let Some(new) = pending else {
                return;
            };
            let caption = self.inner.create_caption(new).await.unwrap();
            let id = caption.id;
            let cached: Option<CaptionDetail> = self
                .views
                .get_or_load(CacheKey::Caption(id), || async {
                    Ok::<_, photocap_api::ApiError>(self.inner.caption_detail(id).await?)
                })
                .await
                .unwrap();
            assert!(cached.is_some());
            *self.created.lock().unwrap() = Some(id);
        }
    }

    #[async_trait]
    impl UserStore for ConcurrentCaption {
        async fn list_users(&self) -> StorageResult<Vec<User>> {
            self.inner.list_users().await
        }
        async fn find_user(&self, id: Uuid) -> StorageResult<Option<User>> {
            self.inner.find_user(id).await
        }
        async fn find_user_by_email(
            &self,
            email: &str,
        ) -> StorageResult<Option<UserCredentials>> {
            self.inner.find_user_by_email(email).await
        }
        async fn user_profile(&self, id: Uuid) -> StorageResult<Option<UserProfile>> {
            self.inner.user_profile(id).await
        }
        async fn create_user(&self, new: NewUser) -> StorageResult<User> {
            self.inner.create_user(new).await
        }
        async fn update_user(
            &self,
            id: Uuid,
            changes: UserChanges,
        ) -> StorageResult<Option<User>> {
            self.interleave().await;
            self.inner.update_user(id, changes).await
        }
        async fn delete_user(&self, id: Uuid) -> StorageResult<bool> {
            self.inner.delete_user(id).await
        }
    }

    #[async_trait]
    impl PhotoStore for ConcurrentCaption {
        async fn list_photos(&self) -> StorageResult<Vec<Photo>> {
            self.inner.list_photos().await
        }
        async fn find_photo(&self, id: Uuid) -> StorageResult<Option<Photo>> {
            self.inner.find_photo(id).await
        }
        async fn photo_detail(&self, id: Uuid) -> StorageResult<Option<PhotoDetail>> {
            self.inner.photo_detail(id).await
        }
        async fn create_photo(&self, new: NewPhoto) -> StorageResult<Photo> {
            self.inner.create_photo(new).await
        }
        async fn update_photo(
            &self,
            id: Uuid,
            changes: PhotoChanges,
        ) -> StorageResult<Option<Photo>> {
            self.interleave().await;
            self.inner.update_photo(id, changes).await
        }
        async fn delete_photo(&self, id: Uuid) -> StorageResult<bool> {
            self.inner.delete_photo(id).await
        }
    }

    #[async_trait]
    impl CaptionStore for ConcurrentCaption {
        async fn find_caption(&self, id: Uuid) -> StorageResult<Option<Caption>> {
            self.inner.find_caption(id).await
        }
        async fn caption_detail(&self, id: Uuid) -> StorageResult<Option<CaptionDetail>> {
            self.inner.caption_detail(id).await
        }
        async fn captions_by_user(&self, user_id: Uuid) -> StorageResult<Vec<Caption>> {
            self.inner.captions_by_user(user_id).await
        }
        async fn captions_by_photo(&self, photo_id: Uuid) -> StorageResult<Vec<Caption>> {
            self.inner.captions_by_photo(photo_id).await
        }
        async fn create_caption(&self, new: NewCaption) -> StorageResult<Caption> {
            self.inner.create_caption(new).await
        }
        async fn update_caption(
            &self,
            id: Uuid,
            comment: String,
        ) -> StorageResult<Option<Caption>> {
            self.inner.update_caption(id, comment).await
        }
        async fn delete_caption(&self, id: Uuid) -> StorageResult<bool> {
            self.inner.delete_caption(id).await
        }
    }

    #[async_trait]
    impl PrimaryStore for ConcurrentCaption {
        async fn health_check(&self) -> StorageResult<()> {
            self.inner.health_check().await
        }
        fn backend_name(&self) -> &'static str {
            "concurrent-caption"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_dropped() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some("bob".into())), Some("bob".into()));
    }

    #[test]
    fn required_rejects_blank() {
        let err = required("email", " ").unwrap_err();
        assert_eq!(err.public_message(), "email is required");
        assert!(required("email", "a@b.com").is_ok());
    }
}
