use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::metrics;

pub const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

// Ensures each request has an X-Request-Id and mirrors it on the response
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let req_id_value = match req.headers().get(&REQUEST_ID) {
        Some(value) => value.clone(),
        None => {
            let value = new_request_id();
            // Inner layers, the trace span included, read it from the headers
            req.headers_mut().insert(REQUEST_ID, value.clone());
            value
        }
    };
    req.extensions_mut().insert(req_id_value.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(REQUEST_ID, req_id_value);
    res
}

fn new_request_id() -> HeaderValue {
    HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}

/// Records request count and latency per method, normalized path and status.
pub async fn http_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let res = next.run(req).await;

    metrics::record_http_request(&method, &path, res.status().as_u16(), start.elapsed());
    res
}
