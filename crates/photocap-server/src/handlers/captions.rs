use axum::{extract::State, http::StatusCode};
use photocap_api::{ApiError, ApiResponse};
use photocap_storage::{Caption, CaptionDetail};

use crate::extractors::{AuthUser, EntityId, JsonBody, OptionalAuthUser};
use crate::server::AppState;
use crate::services::captions::{self, CreateCaption, UpdateCaption};

pub async fn create(
    State(state): State<AppState>,
    caller: AuthUser,
    JsonBody(input): JsonBody<CreateCaption>,
) -> Result<ApiResponse<Caption>, ApiError> {
    Ok(ApiResponse::created(
        captions::create(&state, caller.user_id, input).await?,
    ))
}

pub async fn read(
    State(state): State<AppState>,
    _caller: OptionalAuthUser,
    EntityId(id): EntityId,
) -> Result<ApiResponse<CaptionDetail>, ApiError> {
    Ok(ApiResponse::ok(captions::detail(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    caller: AuthUser,
    EntityId(id): EntityId,
    JsonBody(input): JsonBody<UpdateCaption>,
) -> Result<ApiResponse<Caption>, ApiError> {
    Ok(ApiResponse::ok(
        captions::update(&state, caller.user_id, id, input).await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: AuthUser,
    EntityId(id): EntityId,
) -> Result<StatusCode, ApiError> {
    captions::delete(&state, caller.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
