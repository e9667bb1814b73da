use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use photocap_storage::{
    Caption, CaptionAuthor, CaptionDetail, CaptionPhoto, CaptionStore, NewCaption, NewPhoto,
    NewUser, Photo, PhotoCaption, PhotoChanges, PhotoDetail, PhotoStore, PrimaryStore,
    StorageError, StorageResult, User, UserCaption, UserChanges, UserCredentials, UserProfile,
    UserStore,
};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A stored row plus its insertion sequence, used to break `created_at` ties
/// when ordering newest first.
#[derive(Debug, Clone)]
struct Row<T> {
    seq: u64,
    value: T,
}

#[derive(Debug, Clone)]
struct UserRow {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, Row<UserRow>>,
    photos: HashMap<Uuid, Row<Photo>>,
    captions: HashMap<Uuid, Row<Caption>>,
}

impl Tables {
    fn email_taken(&self, email: &str) -> bool {
        self.users.values().any(|r| r.value.user.email == email)
    }

    fn url_taken(&self, url: &str, except: Option<Uuid>) -> bool {
        self.photos
            .values()
            .any(|r| r.value.url == url && Some(r.value.id) != except)
    }

    fn captions_where(&self, pred: impl Fn(&Caption) -> bool) -> Vec<Caption> {
        newest_first(self.captions.values().filter(|r| pred(&r.value)))
    }
}

fn newest_first<'a, T: Clone + 'a>(
    rows: impl Iterator<Item = &'a Row<T>>,
) -> Vec<T>
where
    T: HasCreatedAt,
{
    let mut rows: Vec<&Row<T>> = rows.collect();
    rows.sort_by(|a, b| {
        (b.value.created_at(), b.seq).cmp(&(a.value.created_at(), a.seq))
    });
    rows.into_iter().map(|r| r.value.clone()).collect()
}

trait HasCreatedAt {
    fn created_at(&self) -> OffsetDateTime;
}

impl HasCreatedAt for UserRow {
    fn created_at(&self) -> OffsetDateTime {
        self.user.created_at
    }
}

impl HasCreatedAt for Photo {
    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

impl HasCreatedAt for Caption {
    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

/// In-memory primary store.
///
/// All three tables live behind a single `RwLock` so that constraint checks
/// and cascading deletes are atomic, matching what the relational store
/// guarantees with transactions and foreign keys.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Number of stored captions (test helper for cascade checks).
    pub async fn caption_count(&self) -> usize {
        self.tables.read().await.captions.len()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn list_users(&self) -> StorageResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.users.values())
            .into_iter()
            .map(|r| r.user)
            .collect())
    }

    async fn find_user(&self, id: Uuid) -> StorageResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|r| r.value.user.clone()))
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> StorageResult<Option<UserCredentials>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|r| r.value.user.email == email)
            .map(|r| UserCredentials {
                user: r.value.user.clone(),
                password_hash: r.value.password_hash.clone(),
            }))
    }

    async fn user_profile(&self, id: Uuid) -> StorageResult<Option<UserProfile>> {
        let tables = self.tables.read().await;
        let Some(row) = tables.users.get(&id) else {
            return Ok(None);
        };
        let captions = tables
            .captions_where(|c| c.user_id == id)
            .iter()
            .map(UserCaption::from)
            .collect();
        Ok(Some(UserProfile {
            user: row.value.user.clone(),
            captions,
        }))
    }

    async fn create_user(&self, new: NewUser) -> StorageResult<User> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        if tables.email_taken(&new.email) {
            return Err(StorageError::conflict("email must be unique"));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            created_at: now,
            updated_at: now,
        };
        let row = Row {
            seq: self.next_seq(),
            value: UserRow {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        };
        tables.users.insert(user.id, row);
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StorageResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            row.value.user.name = name;
        }
        if let Some(hash) = changes.password_hash {
            row.value.password_hash = hash;
        }
        row.value.user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(row.value.user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.captions.retain(|_, r| r.value.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl PhotoStore for InMemoryStore {
    async fn list_photos(&self) -> StorageResult<Vec<Photo>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.photos.values()))
    }

    async fn find_photo(&self, id: Uuid) -> StorageResult<Option<Photo>> {
        let tables = self.tables.read().await;
        Ok(tables.photos.get(&id).map(|r| r.value.clone()))
    }

    async fn photo_detail(&self, id: Uuid) -> StorageResult<Option<PhotoDetail>> {
        let tables = self.tables.read().await;
        let Some(row) = tables.photos.get(&id) else {
            return Ok(None);
        };
        let captions = tables
            .captions_where(|c| c.photo_id == id)
            .iter()
            .map(PhotoCaption::from)
            .collect();
        Ok(Some(PhotoDetail {
            photo: row.value.clone(),
            captions,
        }))
    }

    async fn create_photo(&self, new: NewPhoto) -> StorageResult<Photo> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        if tables.url_taken(&new.url, None) {
            return Err(StorageError::conflict("url must be unique"));
        }
        let now = OffsetDateTime::now_utc();
        let photo = Photo {
            id: Uuid::new_v4(),
            name: new.name,
            url: new.url,
            citation: new.citation,
            created_at: now,
            updated_at: now,
        };
        let row = Row {
            seq: self.next_seq(),
            value: photo.clone(),
        };
        tables.photos.insert(photo.id, row);
        Ok(photo)
    }

    async fn update_photo(&self, id: Uuid, changes: PhotoChanges) -> StorageResult<Option<Photo>> {
        let mut tables = self.tables.write().await;
        if !tables.photos.contains_key(&id) {
            return Ok(None);
        }
        if let Some(url) = changes.url.as_deref()
            && tables.url_taken(url, Some(id))
        {
            return Err(StorageError::conflict("url must be unique"));
        }
        let Some(row) = tables.photos.get_mut(&id) else {
            return Ok(None);
        };
        let photo = &mut row.value;
        if let Some(name) = changes.name {
            photo.name = name;
        }
        if let Some(url) = changes.url {
            photo.url = url;
        }
        if let Some(citation) = changes.citation {
            photo.citation = Some(citation);
        }
        photo.updated_at = OffsetDateTime::now_utc();
        Ok(Some(photo.clone()))
    }

    async fn delete_photo(&self, id: Uuid) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.photos.remove(&id).is_none() {
            return Ok(false);
        }
        tables.captions.retain(|_, r| r.value.photo_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CaptionStore for InMemoryStore {
    async fn find_caption(&self, id: Uuid) -> StorageResult<Option<Caption>> {
        let tables = self.tables.read().await;
        Ok(tables.captions.get(&id).map(|r| r.value.clone()))
    }

    async fn caption_detail(&self, id: Uuid) -> StorageResult<Option<CaptionDetail>> {
        let tables = self.tables.read().await;
        let Some(row) = tables.captions.get(&id) else {
            return Ok(None);
        };
        let caption = row.value.clone();
        let (Some(user), Some(photo)) = (
            tables.users.get(&caption.user_id),
            tables.photos.get(&caption.photo_id),
        ) else {
            return Ok(None);
        };
        Ok(Some(CaptionDetail {
            user: CaptionAuthor::from(&user.value.user),
            photo: CaptionPhoto::from(&photo.value),
            caption,
        }))
    }

    async fn captions_by_user(&self, user_id: Uuid) -> StorageResult<Vec<Caption>> {
        let tables = self.tables.read().await;
        Ok(tables.captions_where(|c| c.user_id == user_id))
    }

    async fn captions_by_photo(&self, photo_id: Uuid) -> StorageResult<Vec<Caption>> {
        let tables = self.tables.read().await;
        Ok(tables.captions_where(|c| c.photo_id == photo_id))
    }

    async fn create_caption(&self, new: NewCaption) -> StorageResult<Caption> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new.user_id) {
            return Err(StorageError::foreign_key("user does not exist"));
        }
        if !tables.photos.contains_key(&new.photo_id) {
            return Err(StorageError::foreign_key("photo does not exist"));
        }
        let now = OffsetDateTime::now_utc();
        let caption = Caption {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            photo_id: new.photo_id,
            comment: new.comment,
            created_at: now,
            updated_at: now,
        };
        let row = Row {
            seq: self.next_seq(),
            value: caption.clone(),
        };
        tables.captions.insert(caption.id, row);
        Ok(caption)
    }

    async fn update_caption(&self, id: Uuid, comment: String) -> StorageResult<Option<Caption>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.captions.get_mut(&id) else {
            return Ok(None);
        };
        row.value.comment = comment;
        row.value.updated_at = OffsetDateTime::now_utc();
        Ok(Some(row.value.clone()))
    }

    async fn delete_caption(&self, id: Uuid) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.captions.remove(&id).is_some())
    }
}

#[async_trait]
impl PrimaryStore for InMemoryStore {
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
