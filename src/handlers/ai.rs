//! Conversation Handlers
//!
//! Turn creation goes through the [`TurnOrchestrator`](crate::conversation::TurnOrchestrator);
//! history, thread and delete routes read storage directly. All routes are
//! scoped to the authenticated account.

use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use super::utils::{is_truthy, parse_id, JsonBody};
use crate::auth::AuthUser;
use crate::constants::DIAGNOSTIC_PROMPT;
use crate::conversation::{resolve_thread, TurnRequest};
use crate::errors::AppError;
use crate::llm::{ChatMessage, GenerationOptions};
use crate::models::{RootSummary, TodoSnapshot, TurnView};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

/// Body of `POST /api/ai/assistance`
#[derive(Debug, Deserialize)]
pub struct AssistanceRequest {
    #[serde(alias = "user_input")]
    pub query: Option<String>,
    pub todos: Option<Vec<TodoSnapshot>>,
    pub parent_id: Option<i64>,
    pub conversation_count: Option<i64>,
}

impl From<AssistanceRequest> for TurnRequest {
    fn from(req: AssistanceRequest) -> Self {
        Self {
            query: req.query,
            todos: req.todos,
            parent_id: req.parent_id,
            conversation_count: req.conversation_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssistanceResponse {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub response: String,
    pub parent_id: Option<i64>,
    pub conversation_count: i64,
    pub model: String,
    /// `provider` or `fallback`
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Group by thread and return only root turns
    pub roots: Option<String>,
}

/// Outcome of a provider diagnostic call
#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderTestResponse {
    pub provider: String,
    pub model: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// POST /api/ai/assistance - Ask about the attached todos, optionally
/// continuing an earlier conversation
pub async fn create_assistance(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    JsonBody(req): JsonBody<AssistanceRequest>,
) -> Result<(StatusCode, Json<AssistanceResponse>), AppError> {
    let outcome = state
        .orchestrator
        .create_turn(user.id, TurnRequest::from(req))
        .await?;

    let turn = outcome.turn;
    Ok((
        StatusCode::CREATED,
        Json(AssistanceResponse {
            id: turn.id,
            timestamp: turn.created_at,
            response: turn.response,
            parent_id: turn.parent_id,
            conversation_count: turn.conversation_count,
            model: turn.model,
            source: outcome.source.as_str().to_string(),
        }),
    ))
}

/// GET /api/ai/history - Most recent turns, newest first
///
/// With `?roots=true` only thread roots are listed, each with its turn count.
pub async fn list_history(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, AppError> {
    let user_id = user.id;
    let limit = state.config.ai.history_limit;
    if is_truthy(query.roots.as_deref()) {
        let roots = state
            .with_db(move |db| db.root_summaries(user_id, limit))
            .await?;
        let summaries: Vec<RootSummary> = roots
            .into_iter()
            .map(|(turn, turn_count)| RootSummary {
                turn: TurnView::from(turn),
                turn_count,
            })
            .collect();
        return Ok(Json(summaries).into_response());
    }

    let turns = state
        .with_db(move |db| db.recent_turns(user_id, limit))
        .await?;
    let views: Vec<TurnView> = turns.into_iter().map(TurnView::from).collect();
    Ok(Json(views).into_response())
}

/// GET /api/ai/thread/{id} - Whole conversation containing a turn, oldest first
pub async fn get_thread(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<Vec<TurnView>>, AppError> {
    let id = parse_id(&raw_id, "conversation_id")?;
    let user_id = user.id;
    let thread = state
        .with_db(move |db| resolve_thread(db, id, user_id))
        .await?;
    if thread.is_empty() {
        return Err(AppError::ConversationNotFound(id));
    }
    Ok(Json(thread.into_iter().map(TurnView::from).collect()))
}

/// DELETE /api/ai/history/{id} - Remove a turn and its direct replies
pub async fn delete_turn(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id(&raw_id, "conversation_id")?;
    let user_id = user.id;
    let deleted = state.with_db(move |db| db.delete_turn(id, user_id)).await?;
    if !deleted {
        return Err(AppError::ConversationNotFound(id));
    }
    tracing::info!(turn_id = id, user_id, "conversation turn deleted");
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /api/ai/history - Remove every turn of the caller
pub async fn clear_history(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = user.id;
    let deleted = state.with_db(move |db| db.delete_all_turns(user_id)).await?;
    tracing::info!(user_id, deleted, "conversation history cleared");
    Ok(Json(serde_json::json!({ "success": true, "deleted": deleted })))
}

/// GET /api/ai/test/{provider} - Send a fixed prompt to one provider
///
/// Provider failures are reported in the body; only an unknown name is an error.
pub async fn test_provider(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ProviderTestResponse>, AppError> {
    let provider = state.providers.get(&name).ok_or_else(|| {
        AppError::invalid(
            "provider",
            format!(
                "unknown provider '{name}' (expected one of: {})",
                state.providers.names().join(", ")
            ),
        )
    })?;

    let options = GenerationOptions {
        max_tokens: state.config.ai.max_tokens,
        temperature: state.config.ai.temperature,
    };
    let messages = [ChatMessage::user(DIAGNOSTIC_PROMPT)];

    let started = Instant::now();
    let result =
        tokio::time::timeout(state.config.ai.timeout, provider.complete(&messages, &options)).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let (content, error) = match result {
        Ok(Ok(text)) => (Some(text), None),
        Ok(Err(e)) => (None, Some(e.to_string())),
        Err(_) => (None, Some("provider timed out".to_string())),
    };
    if let Some(err) = &error {
        tracing::warn!(provider = provider.name(), error = %err, "provider diagnostic failed");
    }

    Ok(Json(ProviderTestResponse {
        provider: provider.name().to_string(),
        model: provider.model().to_string(),
        ok: error.is_none(),
        content,
        error,
        latency_ms,
    }))
}
