//! Structured API errors with stable machine-readable codes
//!
//! Every handler returns `Result<T, AppError>`. Client mistakes map to 4xx with
//! a descriptive message; storage and logic failures map to 500 with a generic
//! message while the full error goes to the log.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error response for API clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application error types with proper categorization
#[derive(Debug)]
pub enum AppError {
    // Validation Errors (400)
    InvalidInput { field: String, reason: String },
    ConversationLimitExceeded { count: i64, max: i64 },
    UsernameTaken(String),

    // Credential Errors (401)
    InvalidCredentials,

    // Not Found Errors (404)
    TodoNotFound(i64),
    ConversationNotFound(i64),
    UserNotFound(i64),
    RouteNotFound(String),

    // Internal Errors (500)
    DatabaseError(String),
    SerializationError(String),
    Internal(anyhow::Error),
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Get error code for client identification
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::ConversationLimitExceeded { .. } => "CONVERSATION_LIMIT_EXCEEDED",
            Self::UsernameTaken(_) => "USERNAME_TAKEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TodoNotFound(_) => "TODO_NOT_FOUND",
            Self::ConversationNotFound(_) => "CONVERSATION_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::RouteNotFound(_) => "NOT_FOUND",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. }
            | Self::ConversationLimitExceeded { .. }
            | Self::UsernameTaken(_) => StatusCode::BAD_REQUEST,

            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,

            Self::TodoNotFound(_)
            | Self::ConversationNotFound(_)
            | Self::UserNotFound(_)
            | Self::RouteNotFound(_) => StatusCode::NOT_FOUND,

            Self::DatabaseError(_) | Self::SerializationError(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the error originates on the server side and must not leak details
    pub fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Get detailed error message
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput { field, reason } => {
                format!("Invalid input for field '{field}': {reason}")
            }
            Self::ConversationLimitExceeded { count, max } => {
                format!("Maximum conversation count exceeded: {count} (max: {max})")
            }
            Self::UsernameTaken(name) => format!("Username already exists: {name}"),
            Self::InvalidCredentials => "Invalid credentials".to_string(),
            Self::TodoNotFound(id) => format!("Todo not found: {id}"),
            Self::ConversationNotFound(id) => format!("Conversation not found: {id}"),
            Self::UserNotFound(id) => format!("User not found: {id}"),
            Self::RouteNotFound(path) => format!("No route for {path}"),
            Self::DatabaseError(msg) => format!("Database error: {msg}"),
            Self::SerializationError(msg) => format!("Serialization error: {msg}"),
            Self::Internal(err) => format!("Internal error: {err}"),
        }
    }

    /// Convert to structured error response
    ///
    /// Server-side failures are reduced to a generic message.
    pub fn to_response(&self) -> ErrorResponse {
        let message = if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.message()
        };
        ErrorResponse {
            code: self.code().to_string(),
            message,
            details: None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        Self::DatabaseError(format!("connection pool: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Body that is not JSON, or JSON of the wrong shape
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid("body", rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(anyhow::anyhow!("blocking task failed: {err}"))
    }
}

/// Axum IntoResponse implementation for proper HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_internal() {
            tracing::error!(code = self.code(), error = %self.message(), "request failed");
        }
        let body = self.to_response();

        (status, Json(body)).into_response()
    }
}

/// Helper trait to convert validation errors
pub trait ValidationErrorExt<T> {
    fn map_validation_err(self, field: &str) -> Result<T>;
}

impl<T> ValidationErrorExt<T> for anyhow::Result<T> {
    fn map_validation_err(self, field: &str) -> Result<T> {
        self.map_err(|e| AppError::InvalidInput {
            field: field.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;
