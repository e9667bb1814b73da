//! PostgreSQL implementation of the primary store traits.

use async_trait::async_trait;
use photocap_storage::{
    Caption, CaptionAuthor, CaptionDetail, CaptionPhoto, CaptionStore, NewCaption, NewPhoto,
    NewUser, Photo, PhotoCaption, PhotoChanges, PhotoDetail, PhotoStore, PrimaryStore,
    StorageError, StorageResult, User, UserCaption, UserChanges, UserCredentials, UserProfile,
    UserStore,
};
use std::time::Duration;

use sqlx_core::query::query;
use sqlx_postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::config::PostgresConfig;
use crate::error::PostgresError;
use crate::{captions, migrations, photos, users};

/// Pooled connections are recycled after this long.
const MAX_CONNECTION_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// PostgreSQL primary store.
///
/// Unique emails and urls, caption foreign keys and cascading deletes are
/// enforced by the schema; constraint violations surface as the matching
/// `StorageError` variant.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects, checks the connection and applies the schema if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if PostgreSQL is unreachable or a migration fails.
    #[tracing::instrument(name = "postgres.connect", skip_all, fields(url = %config.redacted_url()))]
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        tracing::info!(pool_size = config.pool_size, "opening PostgreSQL store");

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .min_connections(config.min_connections())
            .acquire_timeout(config.acquire_timeout)
            .max_lifetime(MAX_CONNECTION_LIFETIME)
            .test_before_acquire(true)
            .connect(&config.url)
            .await
            .map_err(PostgresError::from)?;

        let store = Self { pool };
        store.health_check().await?;

        if config.run_migrations {
            migrations::run(&store.pool).await?;
        } else {
            tracing::info!("skipping migrations");
        }

        Ok(store)
    }

    /// Wraps an existing pool. Migrations are not run.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn list_users(&self) -> StorageResult<Vec<User>> {
        Ok(users::list(&self.pool).await?)
    }

    async fn find_user(&self, id: Uuid) -> StorageResult<Option<User>> {
        Ok(users::find(&self.pool, id).await?)
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> StorageResult<Option<UserCredentials>> {
        Ok(users::find_credentials(&self.pool, email).await?)
    }

    async fn user_profile(&self, id: Uuid) -> StorageResult<Option<UserProfile>> {
        let Some(user) = users::find(&self.pool, id).await? else {
            return Ok(None);
        };
        let captions = captions::by_user(&self.pool, id).await?;
        Ok(Some(UserProfile {
            user,
            captions: captions.iter().map(UserCaption::from).collect(),
        }))
    }

    async fn create_user(&self, new: NewUser) -> StorageResult<User> {
        new.validate()?;
        Ok(users::insert(&self.pool, new).await?)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StorageResult<Option<User>> {
        Ok(users::update(&self.pool, id, changes).await?)
    }

    async fn delete_user(&self, id: Uuid) -> StorageResult<bool> {
        Ok(users::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl PhotoStore for PostgresStore {
    async fn list_photos(&self) -> StorageResult<Vec<Photo>> {
        Ok(photos::list(&self.pool).await?)
    }

    async fn find_photo(&self, id: Uuid) -> StorageResult<Option<Photo>> {
        Ok(photos::find(&self.pool, id).await?)
    }

    async fn photo_detail(&self, id: Uuid) -> StorageResult<Option<PhotoDetail>> {
        let Some(photo) = photos::find(&self.pool, id).await? else {
            return Ok(None);
        };
        let captions = captions::by_photo(&self.pool, id).await?;
        Ok(Some(PhotoDetail {
            photo,
            captions: captions.iter().map(PhotoCaption::from).collect(),
        }))
    }

    async fn create_photo(&self, new: NewPhoto) -> StorageResult<Photo> {
        new.validate()?;
        Ok(photos::insert(&self.pool, new).await?)
    }

    async fn update_photo(&self, id: Uuid, changes: PhotoChanges) -> StorageResult<Option<Photo>> {
        Ok(photos::update(&self.pool, id, changes).await?)
    }

    async fn delete_photo(&self, id: Uuid) -> StorageResult<bool> {
        Ok(photos::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl CaptionStore for PostgresStore {
    async fn find_caption(&self, id: Uuid) -> StorageResult<Option<Caption>> {
        Ok(captions::find(&self.pool, id).await?)
    }

    async fn caption_detail(&self, id: Uuid) -> StorageResult<Option<CaptionDetail>> {
        let Some(caption) = captions::find(&self.pool, id).await? else {
            return Ok(None);
        };
        let user = users::find(&self.pool, caption.user_id).await?;
        let photo = photos::find(&self.pool, caption.photo_id).await?;
        let (Some(user), Some(photo)) = (user, photo) else {
            // Deleted concurrently; the cascade removes the caption too.
            return Ok(None);
        };
        Ok(Some(CaptionDetail {
            caption,
            user: CaptionAuthor::from(&user),
            photo: CaptionPhoto::from(&photo),
        }))
    }

    async fn captions_by_user(&self, user_id: Uuid) -> StorageResult<Vec<Caption>> {
        Ok(captions::by_user(&self.pool, user_id).await?)
    }

    async fn captions_by_photo(&self, photo_id: Uuid) -> StorageResult<Vec<Caption>> {
        Ok(captions::by_photo(&self.pool, photo_id).await?)
    }

    async fn create_caption(&self, new: NewCaption) -> StorageResult<Caption> {
        new.validate()?;
        Ok(captions::insert(&self.pool, new).await?)
    }

    async fn update_caption(&self, id: Uuid, comment: String) -> StorageResult<Option<Caption>> {
        Ok(captions::update(&self.pool, id, comment).await?)
    }

    async fn delete_caption(&self, id: Uuid) -> StorageResult<bool> {
        Ok(captions::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl PrimaryStore for PostgresStore {
    async fn health_check(&self) -> StorageResult<()> {
        query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
