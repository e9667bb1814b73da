use axum::{extract::State, http::StatusCode};
use photocap_api::{ApiError, ApiResponse};
use photocap_storage::{Photo, PhotoDetail};

use crate::extractors::{AuthUser, EntityId, JsonBody, OptionalAuthUser};
use crate::server::AppState;
use crate::services::photos::{self, CreatePhoto, UpdatePhoto};

pub async fn list(State(state): State<AppState>) -> Result<ApiResponse<Vec<Photo>>, ApiError> {
    Ok(ApiResponse::ok(photos::list(&state).await?))
}

pub async fn create(
    State(state): State<AppState>,
    _caller: AuthUser,
    JsonBody(input): JsonBody<CreatePhoto>,
) -> Result<ApiResponse<Photo>, ApiError> {
    Ok(ApiResponse::created(photos::create(&state, input).await?))
}

pub async fn read(
    State(state): State<AppState>,
    _caller: OptionalAuthUser,
    EntityId(id): EntityId,
) -> Result<ApiResponse<PhotoDetail>, ApiError> {
    Ok(ApiResponse::ok(photos::detail(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    _caller: AuthUser,
    EntityId(id): EntityId,
    JsonBody(input): JsonBody<UpdatePhoto>,
) -> Result<ApiResponse<Photo>, ApiError> {
    Ok(ApiResponse::ok(photos::update(&state, id, input).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    _caller: AuthUser,
    EntityId(id): EntityId,
) -> Result<StatusCode, ApiError> {
    photos::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
