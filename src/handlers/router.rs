//! Router Configuration - Centralized route definitions
//!
//! Routes are organized by domain and split into public (no auth) and
//! protected (bearer token required).

use std::path::PathBuf;

use axum::{
    extract::Request,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use super::state::AppState;
use super::{ai, health, todos, users};
use crate::auth::auth_middleware;
use crate::errors::AppError;

/// Build the public routes (no authentication required)
///
/// Probes and metrics must stay reachable for orchestrators and scrapers;
/// register and login are how a token is obtained in the first place.
pub fn build_public_routes(state: AppState) -> Router {
    Router::new()
        // =================================================================
        // HEALTH & PROBES
        // =================================================================
        .route("/health", get(health::health))
        .route("/health/live", get(health::health_live))
        .route("/health/ready", get(health::health_ready))
        .route("/api/status", get(health::api_status))
        // =================================================================
        // METRICS (PROMETHEUS)
        // =================================================================
        .route("/metrics", get(health::metrics_endpoint))
        // =================================================================
        // ACCOUNT ENTRY POINTS
        // =================================================================
        .route("/api/auth/register", post(users::register))
        .route("/api/auth/login", post(users::login))
        .with_state(state)
}

/// Build the protected routes
///
/// Every route here runs behind `auth_middleware`, which puts the caller's
/// account into request extensions.
pub fn build_protected_routes(state: AppState) -> Router {
    Router::new()
        // =================================================================
        // ACCOUNT
        // =================================================================
        .route(
            "/api/auth/me",
            get(users::me).put(users::update_me).delete(users::delete_me),
        )
        // =================================================================
        // TODOS
        // =================================================================
        .route("/api/todos", get(todos::list_todos).post(todos::create_todo))
        .route(
            "/api/todos/{id}",
            get(todos::get_todo)
                .put(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .route("/api/todos/{id}/toggle", patch(todos::toggle_todo))
        // =================================================================
        // AI CONVERSATIONS
        // =================================================================
        .route("/api/ai/assistance", post(ai::create_assistance))
        .route(
            "/api/ai/history",
            get(ai::list_history).delete(ai::clear_history),
        )
        .route("/api/ai/history/{id}", delete(ai::delete_turn))
        .route("/api/ai/thread/{id}", get(ai::get_thread))
        .route("/api/ai/test/{provider}", get(ai::test_provider))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
        // =================================================================
        // STATE
        // =================================================================
        .with_state(state)
}

/// Build the complete router with both public and protected routes
///
/// Metrics, concurrency and CORS layers are applied by the caller.
pub fn build_router(state: AppState) -> Router {
    let frontend = state.config.static_dir.clone();
    let public = build_public_routes(state.clone());
    let protected = build_protected_routes(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(move |req: Request| unmatched(frontend.clone(), req))
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Unmatched requests
///
/// API paths always get a JSON 404. Anything else goes to the frontend
/// directory when one is configured, with `index.html` for client routes.
async fn unmatched(frontend: Option<PathBuf>, req: Request) -> Response {
    match frontend {
        Some(dir) if !is_api_path(req.uri().path()) => {
            let index = dir.join("index.html");
            let spa = ServeDir::new(dir).not_found_service(ServeFile::new(index));
            match spa.oneshot(req).await {
                Ok(res) => res.into_response(),
                Err(never) => match never {},
            }
        }
        _ => AppError::RouteNotFound(req.uri().path().to_string()).into_response(),
    }
}
