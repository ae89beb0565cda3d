//! Todo Handlers
//!
//! CRUD over the caller's own todos. Lookups are always scoped to the
//! authenticated account, so another user's id reads as not found.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::state::AppState;
use super::utils::{parse_id, JsonBody};
use crate::auth::AuthUser;
use crate::errors::{AppError, ValidationErrorExt};
use crate::models::{deserialize_some, NewTodo, Todo, TodoPatch};
use crate::validation;

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub priority: Option<i64>,
    #[serde(alias = "dueDate")]
    pub due_date: Option<String>,
}

/// Partial update; `null` clears priority or due date
#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub priority: Option<Option<i64>>,
    #[serde(default, alias = "dueDate", deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoResponse {
    pub todo: Todo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoListResponse {
    pub todos: Vec<Todo>,
}

fn parse_due_date(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => Ok(Some(
            validation::validate_due_date(raw).map_validation_err("due_date")?,
        )),
        _ => Ok(None),
    }
}

impl UpdateTodoRequest {
    fn into_patch(self) -> Result<TodoPatch, AppError> {
        let title = match self.title {
            Some(title) => Some(validation::validate_title(&title).map_validation_err("title")?),
            None => None,
        };
        let due_date = match self.due_date {
            Some(raw) => Some(parse_due_date(raw.as_deref())?),
            None => None,
        };
        Ok(TodoPatch {
            title,
            completed: self.completed,
            priority: self.priority,
            due_date,
        })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// GET /api/todos - All of the caller's todos, newest first
pub async fn list_todos(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<TodoListResponse>, AppError> {
    let todos = state.with_db(move |db| db.list_todos(user.id)).await?;
    Ok(Json(TodoListResponse { todos }))
}

/// GET /api/todos/{id}
pub async fn get_todo(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<TodoResponse>, AppError> {
    let id = parse_id(&raw_id, "todo_id")?;
    let todo = state
        .with_db(move |db| db.get_todo(id, user.id))
        .await?
        .ok_or(AppError::TodoNotFound(id))?;
    Ok(Json(TodoResponse { todo }))
}

/// POST /api/todos - Create a todo
pub async fn create_todo(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), AppError> {
    let title = req
        .title
        .ok_or_else(|| AppError::invalid("title", "Title is required"))?;
    let new = NewTodo {
        title: validation::validate_title(&title).map_validation_err("title")?,
        completed: req.completed,
        priority: req.priority,
        due_date: parse_due_date(req.due_date.as_deref())?,
    };

    let todo = state.with_db(move |db| db.create_todo(user.id, &new)).await?;
    tracing::debug!(todo_id = todo.id, user_id = todo.user_id, "todo created");
    Ok((StatusCode::CREATED, Json(TodoResponse { todo })))
}

/// PUT /api/todos/{id} - Merge the provided fields into a todo
pub async fn update_todo(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(raw_id): Path<String>,
    JsonBody(req): JsonBody<UpdateTodoRequest>,
) -> Result<Json<TodoResponse>, AppError> {
    let id = parse_id(&raw_id, "todo_id")?;
    let patch = req.into_patch()?;
    if patch.is_empty() {
        return Err(AppError::invalid("body", "No update fields provided"));
    }

    let todo = state
        .with_db(move |db| db.update_todo(id, user.id, &patch))
        .await?
        .ok_or(AppError::TodoNotFound(id))?;
    Ok(Json(TodoResponse { todo }))
}

/// PATCH /api/todos/{id}/toggle - Flip completion
pub async fn toggle_todo(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<TodoResponse>, AppError> {
    let id = parse_id(&raw_id, "todo_id")?;
    let todo = state
        .with_db(move |db| db.toggle_todo(id, user.id))
        .await?
        .ok_or(AppError::TodoNotFound(id))?;
    Ok(Json(TodoResponse { todo }))
}

/// DELETE /api/todos/{id}
pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id(&raw_id, "todo_id")?;
    let deleted = state.with_db(move |db| db.delete_todo(id, user.id)).await?;
    if !deleted {
        return Err(AppError::TodoNotFound(id));
    }
    Ok(Json(serde_json::json!({ "message": "Todo deleted" })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::{TodoListResponse, TodoResponse};
    use crate::handlers::test_helpers::{
        delete, get, patch, post_json, put_json, send, send_typed, TestHarness,
    };

    #[tokio::test]
    async fn test_create_and_list() {
        let h = TestHarness::new();
        let (_, token) = h.user_with_token("alice");

        let (status, created): (_, TodoResponse) = send_typed(
            h.router(),
            post_json(
                "/api/todos",
                &token,
                &json!({"title": "  Buy milk ", "priority": 1, "due_date": "2026-03-01"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.todo.title, "Buy milk");
        assert!(!created.todo.completed);
        assert_eq!(created.todo.priority, Some(1));
        assert_eq!(created.todo.due_date.unwrap().to_string(), "2026-03-01");

        send(
            h.router(),
            post_json("/api/todos", &token, &json!({"title": "Walk dog"})),
        )
        .await;

        let (status, list): (_, TodoListResponse) =
            send_typed(h.router(), get("/api/todos", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.todos.len(), 2);
        assert_eq!(list.todos[0].title, "Walk dog");
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let h = TestHarness::new();
        let (_, token) = h.user_with_token("alice");

        let (status, body) = send(
            h.router(),
            post_json("/api/todos", &token, &json!({"title": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");

        let (status, _) = send(
            h.router(),
            post_json(
                "/api/todos",
                &token,
                &json!({"title": "ok", "due_date": "next tuesday"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_partial_update_and_clear() {
        let h = TestHarness::new();
        let (_, token) = h.user_with_token("alice");
        let (_, created): (_, TodoResponse) = send_typed(
            h.router(),
            post_json(
                "/api/todos",
                &token,
                &json!({"title": "Buy milk", "priority": 2, "due_date": "2026-03-01"}),
            ),
        )
        .await;
        let uri = format!("/api/todos/{}", created.todo.id);

        let (status, updated): (_, TodoResponse) = send_typed(
            h.router(),
            put_json(&uri, &token, &json!({"completed": true, "priority": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(updated.todo.completed);
        assert_eq!(updated.todo.priority, None);
        assert_eq!(updated.todo.title, "Buy milk");
        assert!(updated.todo.due_date.is_some());

        let (status, body) = send(h.router(), put_json(&uri, &token, &json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_toggle_and_delete() {
        let h = TestHarness::new();
        let (_, token) = h.user_with_token("alice");
        let (_, created): (_, TodoResponse) = send_typed(
            h.router(),
            post_json("/api/todos", &token, &json!({"title": "Buy milk"})),
        )
        .await;
        let id = created.todo.id;

        let (_, toggled): (_, TodoResponse) = send_typed(
            h.router(),
            patch(&format!("/api/todos/{id}/toggle"), &token),
        )
        .await;
        assert!(toggled.todo.completed);

        let (status, _) = send(h.router(), delete(&format!("/api/todos/{id}"), &token)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(h.router(), get(&format!("/api/todos/{id}"), &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "TODO_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_foreign_todo_is_not_found() {
        let h = TestHarness::new();
        let (_, alice) = h.user_with_token("alice");
        let (_, bob) = h.user_with_token("bob");
        let (_, created): (_, TodoResponse) = send_typed(
            h.router(),
            post_json("/api/todos", &alice, &json!({"title": "Buy milk"})),
        )
        .await;
        let uri = format!("/api/todos/{}", created.todo.id);

        let (status, _) = send(h.router(), get(&uri, &bob)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(h.router(), delete(&uri, &bob)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_id() {
        let h = TestHarness::new();
        let (_, token) = h.user_with_token("alice");
        let (status, body) = send(h.router(), get("/api/todos/abc", &token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_wrongly_typed_fields_are_invalid_input() {
        let h = TestHarness::new();
        let (_, token) = h.user_with_token("alice");

        let (status, body) = send(
            h.router(),
            post_json("/api/todos", &token, &json!({"title": "Buy milk", "priority": "high"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");

        let (_, created): (_, TodoResponse) = send_typed(
            h.router(),
            post_json("/api/todos", &token, &json!({"title": "Buy milk"})),
        )
        .await;
        let (status, body) = send(
            h.router(),
            put_json(
                &format!("/api/todos/{}", created.todo.id),
                &token,
                &json!({"completed": "yes"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }
}
