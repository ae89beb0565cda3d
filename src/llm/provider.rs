//! Language-model provider interface
//!
//! Providers turn a role-tagged message list into generated text. They never
//! retry; the conversation orchestrator decides what a failure means.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Speaker of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Sampling bounds sent with every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Provider failure, always recoverable by the caller
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Server error ({status}): {message}")]
    ServerError { message: String, status: u16 },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("{message}")]
    Other { message: String },
}

pub type LlmResult<T> = Result<T, LlmError>;

/// Trait every language-model backend implements
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logs and metrics
    fn name(&self) -> &str;

    /// Model identifier recorded on stored turns
    fn model(&self) -> &str;

    /// Send the messages and return the generated text
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> LlmResult<String>;
}

/// Error for a provider used without an API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Map an HTTP status and body to a typed error
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status,
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::ParseError {
                message: err.to_string(),
            }
        } else {
            LlmError::NetworkError {
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_error() {
        let err = missing_api_key_error("deepseek");
        assert!(matches!(err, LlmError::AuthenticationFailed { .. }));
        assert!(err.to_string().contains("deepseek"));
    }

    #[test]
    fn test_parse_http_error() {
        assert!(matches!(
            parse_http_error(401, "", "openai"),
            LlmError::AuthenticationFailed { .. }
        ));
        assert!(matches!(
            parse_http_error(429, "slow down", "openai"),
            LlmError::RateLimited { .. }
        ));
        assert!(matches!(
            parse_http_error(503, "overloaded", "gemini"),
            LlmError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            parse_http_error(418, "teapot", "gemini"),
            LlmError::Other { .. }
        ));
    }

    #[test]
    fn test_role_serialization() {
        let msg = ChatMessage::system("be brief");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(ChatRole::Assistant.as_str(), "assistant");
    }
}
