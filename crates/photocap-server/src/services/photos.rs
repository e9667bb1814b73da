//! Photo metadata.

use photocap_api::ApiError;
use photocap_storage::{NewPhoto, Photo, PhotoChanges, PhotoDetail};
use serde::Deserialize;
use uuid::Uuid;

use super::{non_blank, required};
use crate::cache::{CacheKey, invalidation};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePhoto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    pub citation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdatePhoto {
    pub name: Option<String>,
    pub url: Option<String>,
    pub citation: Option<String>,
}

pub async fn list(state: &AppState) -> Result<Vec<Photo>, ApiError> {
    Ok(state.store.list_photos().await?)
}

pub async fn detail(state: &AppState, id: Uuid) -> Result<PhotoDetail, ApiError> {
    state
        .views
        .get_or_load(CacheKey::Photo(id), || async {
            Ok::<_, ApiError>(state.store.photo_detail(id).await?)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Photo Not Found"))
}

pub async fn create(state: &AppState, input: CreatePhoto) -> Result<Photo, ApiError> {
    required("name", &input.name)?;
    required("url", &input.url)?;

    let photo = state
        .store
        .create_photo(NewPhoto {
            name: input.name,
            url: input.url,
            citation: non_blank(input.citation),
        })
        .await?;
    tracing::info!(photo_id = %photo.id, "photo created");
    Ok(photo)
}

pub async fn update(state: &AppState, id: Uuid, input: UpdatePhoto) -> Result<Photo, ApiError> {
    if state.store.find_photo(id).await?.is_none() {
        return Err(ApiError::not_found("Photo Not Found"));
    }

    let changes = PhotoChanges {
        name: non_blank(input.name),
        url: non_blank(input.url),
        citation: non_blank(input.citation),
    };
    let photo = state
        .store
        .update_photo(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Photo Not Found"))?;

    // Captions still exist after an update; reading them now also catches
    // ones added while the update ran.
    let captions = state.store.captions_by_photo(id).await?;
    state
        .invalidator
        .invalidate(invalidation::photo_updated_keys(id, &captions))
        .await;
    Ok(photo)
}

pub async fn delete(state: &AppState, id: Uuid) -> Result<(), ApiError> {
    if state.store.find_photo(id).await?.is_none() {
        return Err(ApiError::not_found("Photo Not Found"));
    }
    let captions = state.store.captions_by_photo(id).await?;

    if !state.store.delete_photo(id).await? {
        return Err(ApiError::not_found("Photo Not Found"));
    }

    state
        .invalidator
        .invalidate(invalidation::photo_deleted_keys(id, &captions))
        .await;
    tracing::info!(photo_id = %id, captions = captions.len(), "photo deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use photocap_storage::{NewCaption, NewUser};

    use super::*;
    use crate::cache::{CacheBackend, ReadThroughCache};
    use crate::config::AppConfig;
    use crate::services::captions;
    use crate::services::test_support::ConcurrentCaption;

    #[tokio::test]
    async fn update_refreshes_captions_added_during_the_write() {
        let cfg = AppConfig::default();
        let cache = CacheBackend::new_local();
        let views = ReadThroughCache::new(cache.clone(), cfg.cache.entity_ttl(), cfg.cache.on_error);
        let store = Arc::new(ConcurrentCaption::new(
            photocap_db_memory::create_primary_store(),
            views,
        ));
        let state = AppState::new(store.clone(), cache, &cfg);

        let user = state
            .store
            .create_user(NewUser {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let photo = state
            .store
            .create_photo(NewPhoto {
                name: "Monkey".into(),
                url: "https://example.com/monkey.jpg".into(),
                citation: None,
            })
            .await
            .unwrap();
        store.arm(NewCaption {
            user_id: user.id,
            photo_id: photo.id,
            comment: "selfie".into(),
        });

        update(
            &state,
            photo.id,
            UpdatePhoto {
                name: Some("Macaque".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let caption_id = store.created().unwrap();
        let view = captions::detail(&state, caption_id).await.unwrap();
        assert_eq!(view.photo.name, "Macaque");
    }
}
