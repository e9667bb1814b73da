//! Prometheus metrics for the Photocap server.
//!
//! - HTTP request count and latency
//! - Read-through cache hits, misses, bypasses and populate failures
//! - Invalidation deletes and their failures

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    // Cache metrics
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_BYPASS_TOTAL: &str = "cache_bypass_total";
    pub const CACHE_POPULATE_FAILURES_TOTAL: &str = "cache_populate_failures_total";
    pub const CACHE_INVALIDATIONS_TOTAL: &str = "cache_invalidations_total";
    pub const CACHE_INVALIDATION_FAILURES_TOTAL: &str = "cache_invalidation_failures_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // Pull-based: /metrics renders from the handle
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }

            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

// =============================================================================
// HTTP Metrics
// =============================================================================

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let status_class = match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };

    let normalized_path = normalize_path(path);

    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status" => status.to_string(),
        "status_class" => status_class.to_string()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => normalized_path
    )
    .record(duration.as_secs_f64());
}

// =============================================================================
// Cache Metrics
// =============================================================================

pub fn record_cache_hit(entity: &str) {
    counter!(names::CACHE_HITS_TOTAL, "entity" => entity.to_string()).increment(1);
}

pub fn record_cache_miss(entity: &str) {
    counter!(names::CACHE_MISSES_TOTAL, "entity" => entity.to_string()).increment(1);
}

/// The cache failed and the read went straight to the primary store.
pub fn record_cache_bypass(entity: &str) {
    counter!(names::CACHE_BYPASS_TOTAL, "entity" => entity.to_string()).increment(1);
}

pub fn record_cache_populate_failure(entity: &str) {
    counter!(names::CACHE_POPULATE_FAILURES_TOTAL, "entity" => entity.to_string()).increment(1);
}

pub fn record_cache_invalidation(entity: &str) {
    counter!(names::CACHE_INVALIDATIONS_TOTAL, "entity" => entity.to_string()).increment(1);
}

pub fn record_cache_invalidation_failure(entity: &str) {
    counter!(names::CACHE_INVALIDATION_FAILURES_TOTAL, "entity" => entity.to_string())
        .increment(1);
}

// =============================================================================
// Helpers
// =============================================================================

/// Replaces ids with `{id}` so each route has one label value.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|part| if is_likely_id(part) { "{id}" } else { part })
        .collect::<Vec<_>>()
        .join("/")
}

/// Check if a string looks like an ID (UUID or numeric).
fn is_likely_id(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    if s.len() == 36 && s.chars().filter(|c| *c == '-').count() == 4 {
        return true;
    }
    s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("/photos/550e8400-e29b-41d4-a716-446655440000"),
            "/photos/{id}"
        );
        assert_eq!(normalize_path("/users/12"), "/users/{id}");
        assert_eq!(normalize_path("/users/login"), "/users/login");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_is_likely_id() {
        assert!(is_likely_id("12345"));
        assert!(is_likely_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_likely_id("captions"));
        assert!(!is_likely_id(""));
    }
}
