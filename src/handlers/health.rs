//! Health and Infrastructure Handlers
//!
//! Probes, service status and metrics.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

use super::state::AppState;
use crate::metrics;

/// Health response for main health endpoint
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: bool,
    pub ai_provider: String,
}

/// Main health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.clone();
    let database = tokio::task::spawn_blocking(move || db.is_healthy())
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: if database { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        ai_provider: state.providers.active().name().to_string(),
    })
}

/// Liveness probe - always succeeds if the process answers
pub async fn health_live() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

/// Readiness probe - 503 until the database answers
pub async fn health_ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let db = state.db.clone();
    let ready = tokio::task::spawn_blocking(move || db.is_healthy())
        .await
        .unwrap_or(false);

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

/// Service status used by the frontend banner
pub async fn api_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "online",
        "time": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "env": state.config.env_label(),
    }))
}

/// Prometheus metrics in text exposition format
pub async fn metrics_endpoint() -> Result<String, StatusCode> {
    metrics::render().map_err(|e| {
        tracing::error!("Failed to encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
