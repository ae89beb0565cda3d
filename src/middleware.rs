//! HTTP request tracking middleware for observability

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::debug;

/// Record latency and count for every request
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    let normalized_path = normalize_path(&path);

    crate::metrics::HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &normalized_path, &status])
        .observe(duration);

    crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &normalized_path, &status])
        .inc();

    debug!(
        method = %method,
        path = %normalized_path,
        status = %status,
        latency_ms = (duration * 1000.0) as u64,
        "request handled"
    );

    response
}

/// Normalize path to prevent metric cardinality explosion
/// /api/todos/42/toggle -> /api/todos/{id}/toggle
fn normalize_path(path: &str) -> String {
    let normalized: Vec<&str> = path
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| if is_id(part) { "{id}" } else { part })
        .collect();

    format!("/{}", normalized.join("/"))
}

/// Numeric segments are row ids; anything very long is treated as opaque
fn is_id(segment: &str) -> bool {
    segment.chars().all(|c| c.is_ascii_digit()) || segment.len() > 40
}
