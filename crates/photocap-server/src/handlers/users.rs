use axum::{
    extract::State,
    http::{HeaderValue, StatusCode, header},
};
use photocap_api::{ApiError, ApiResponse};
use photocap_storage::{User, UserProfile};
use serde_json::{Value, json};

use crate::extractors::{AuthUser, EntityId, JsonBody, OptionalAuthUser};
use crate::server::AppState;
use crate::services::users::{self, CreateUser, LoginRequest, LoginResponse, UpdateUser, UserSummary};

pub async fn list(State(state): State<AppState>) -> Result<ApiResponse<Vec<UserSummary>>, ApiError> {
    Ok(ApiResponse::ok(users::list(&state).await?))
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateUser>,
) -> Result<ApiResponse<User>, ApiError> {
    Ok(ApiResponse::created(users::create(&state, input).await?))
}

/// Public, but a presented token must be valid.
pub async fn read(
    State(state): State<AppState>,
    _caller: OptionalAuthUser,
    EntityId(id): EntityId,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    Ok(ApiResponse::ok(users::profile(&state, id).await?))
}

/// Returns the token in the body and in the `Authorization` header.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiError> {
    let session = users::login(&state, input).await?;
    let value = HeaderValue::from_str(&session.token)
        .map_err(|e| ApiError::internal(format!("token is not a valid header value: {e}")))?;
    Ok(ApiResponse::ok(session).with_header(header::AUTHORIZATION, value))
}

pub async fn logout(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<ApiResponse<Value>, ApiError> {
    users::logout(&state, &caller.token).await?;
    tracing::info!(user_id = %caller.user_id, "user logged out");
    Ok(ApiResponse::ok(json!({ "message": "Logout successful" })))
}

pub async fn update(
    State(state): State<AppState>,
    caller: AuthUser,
    EntityId(id): EntityId,
    JsonBody(input): JsonBody<UpdateUser>,
) -> Result<ApiResponse<UserSummary>, ApiError> {
    Ok(ApiResponse::ok(
        users::update(&state, caller.user_id, id, input).await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: AuthUser,
    EntityId(id): EntityId,
) -> Result<StatusCode, ApiError> {
    users::delete(&state, caller.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
