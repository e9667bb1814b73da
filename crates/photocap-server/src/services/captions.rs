//! Captions. Only the author may change or remove one.

use photocap_api::ApiError;
use photocap_storage::{Caption, CaptionDetail, NewCaption};
use serde::Deserialize;
use uuid::Uuid;

use super::{non_blank, required};
use crate::cache::{CacheKey, invalidation};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaption {
    pub photo_id: Option<Uuid>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateCaption {
    pub comment: Option<String>,
}

pub async fn detail(state: &AppState, id: Uuid) -> Result<CaptionDetail, ApiError> {
    state
        .views
        .get_or_load(CacheKey::Caption(id), || async {
            Ok::<_, ApiError>(state.store.caption_detail(id).await?)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Caption Not Found"))
}

/// Adds a caption by `caller` to the requested photo.
pub async fn create(
    state: &AppState,
    caller: Uuid,
    input: CreateCaption,
) -> Result<Caption, ApiError> {
    let photo_id = input
        .photo_id
        .ok_or_else(|| ApiError::bad_request("photoId is required"))?;
    required("comment", &input.comment)?;

    let caption = state
        .store
        .create_caption(NewCaption {
            user_id: caller,
            photo_id,
            comment: input.comment,
        })
        .await?;

    state
        .invalidator
        .invalidate(invalidation::caption_created_keys(&caption))
        .await;
    Ok(caption)
}

pub async fn update(
    state: &AppState,
    caller: Uuid,
    id: Uuid,
    input: UpdateCaption,
) -> Result<Caption, ApiError> {
    let existing = owned_caption(state, caller, id, "update").await?;

    let comment = non_blank(input.comment).unwrap_or_else(|| existing.comment.clone());
    let caption = state
        .store
        .update_caption(id, comment)
        .await?
        .ok_or_else(|| ApiError::not_found("Caption Not Found"))?;

    state
        .invalidator
        .invalidate(invalidation::caption_changed_keys(&existing))
        .await;
    Ok(caption)
}

pub async fn delete(state: &AppState, caller: Uuid, id: Uuid) -> Result<(), ApiError> {
    let existing = owned_caption(state, caller, id, "delete").await?;

    if !state.store.delete_caption(id).await? {
        return Err(ApiError::not_found("Caption Not Found"));
    }

    state
        .invalidator
        .invalidate(invalidation::caption_changed_keys(&existing))
        .await;
    Ok(())
}

async fn owned_caption(
    state: &AppState,
    caller: Uuid,
    id: Uuid,
    action: &str,
) -> Result<Caption, ApiError> {
    let caption = state
        .store
        .find_caption(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Caption Not Found"))?;
    if caption.user_id != caller {
        return Err(ApiError::forbidden(format!(
            "User not authorized to {action} this caption."
        )));
    }
    Ok(caption)
}
