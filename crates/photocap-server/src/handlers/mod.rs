use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use photocap_api::ApiError;
use serde::Serialize;

use crate::metrics::render_metrics;
use crate::server::AppState;

pub mod captions;
pub mod photos;
pub mod users;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    (StatusCode::OK, "The Application is running.")
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Ready once both the cache and the primary store answer.
pub async fn readyz(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = state.cache.ping().await {
        tracing::warn!(error = %e, "readiness: cache unavailable");
        return Err(ApiError::service_unavailable("cache unavailable"));
    }
    if let Err(e) = state.store.health_check().await {
        tracing::warn!(error = %e, "readiness: primary store unavailable");
        return Err(ApiError::service_unavailable("primary store unavailable"));
    }
    Ok((StatusCode::OK, Json(HealthResponse { status: "ready" })))
}

pub async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let body = render_metrics()
        .ok_or_else(|| ApiError::service_unavailable("metrics not initialized"))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

pub async fn fallback() -> ApiError {
    ApiError::not_found("Not Found")
}
