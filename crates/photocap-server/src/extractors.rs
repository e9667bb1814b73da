//! Request extractors: bearer authentication, JSON bodies and path ids.
//!
//! Every rejection is an [`ApiError`], so failures render as
//! `{"error": "..."}` like the rest of the API.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequest, FromRequestParts, Path, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use photocap_api::{ApiError, INVALID_TOKEN};
use photocap_auth::JwtService;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::cache::TokenStore;

/// What the auth extractors need from the application state.
#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<JwtService>,
    pub tokens: TokenStore,
}

/// An authenticated caller.
///
/// The bearer token must carry a valid signature AND be live in the token
/// store. Expired, revoked and forged tokens are all rejected with the same
/// 401. If liveness cannot be checked the request fails with 500.
///
/// ```ignore
/// async fn handler(caller: AuthUser) -> impl IntoResponse {
///     format!("hello {}", caller.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub token: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);

        let Some(token) = bearer_token(parts) else {
            tracing::debug!(path = %parts.uri.path(), "missing bearer token");
            return Err(ApiError::unauthorized(INVALID_TOKEN));
        };

        let claims = auth.jwt.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            ApiError::unauthorized(INVALID_TOKEN)
        })?;
        let user_id = claims
            .user_id()
            .map_err(|_| ApiError::unauthorized(INVALID_TOKEN))?;

        if !auth.tokens.is_live(token).await? {
            tracing::debug!(user_id = %user_id, "token not live");
            return Err(ApiError::unauthorized(INVALID_TOKEN));
        }

        Ok(AuthUser {
            user_id,
            token: token.to_string(),
        })
    }
}

/// Like [`AuthUser`], but a request without an `Authorization` header is
/// anonymous instead of rejected. A header that is present must still be
/// valid.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(OptionalAuthUser(None));
        }
        AuthUser::from_request_parts(parts, state)
            .await
            .map(|user| OptionalAuthUser(Some(user)))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// JSON request body. Malformed input is a 400.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(value)| JsonBody(value))
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
    }
}

/// `{id}` path segment parsed as a UUID. Anything else is a 400.
#[derive(Debug, Clone, Copy)]
pub struct EntityId(pub Uuid);

impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Uuid::parse_str(&raw)
            .map(EntityId)
            .map_err(|_| ApiError::bad_request(format!("Invalid id: {raw}")))
    }
}
