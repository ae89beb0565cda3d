//! Shared test utilities for handler unit tests.
//!
//! Provides a [`TestHarness`] backed by an in-memory SQLite database and a
//! scripted language model, plus helpers for building bearer-authenticated
//! requests and reading JSON response bodies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tower::ServiceExt; // for oneshot()

use super::router::build_router;
use super::state::{AppState, ServerState};
use crate::config::ServerConfig;
use crate::llm::{
    ChatMessage, ChatProvider, ChatRole, GenerationOptions, LlmError, LlmResult, ProviderRegistry,
};
use crate::models::User;
use crate::storage::Database;

/// Answer returned by the default scripted provider.
pub const SCRIPTED_ANSWER: &str = "Start with the high priority items.";

/// A self-contained test environment with its own in-memory database.
pub struct TestHarness {
    pub state: AppState,
}

impl TestHarness {
    /// Harness whose language model always answers [`SCRIPTED_ANSWER`].
    pub fn new() -> Self {
        Self::with_provider(Arc::new(ScriptedProvider::new(SCRIPTED_ANSWER)))
    }

    pub fn with_provider(provider: Arc<dyn ChatProvider>) -> Self {
        let db = Database::new_in_memory().expect("failed to open in-memory database");
        let state = ServerState::new(
            ServerConfig::default(),
            db,
            ProviderRegistry::single(provider),
        );
        Self {
            state: Arc::new(state),
        }
    }

    /// Build the full application router (public + protected routes).
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Create an account directly in storage and sign a token for it.
    pub fn user_with_token(&self, username: &str) -> (User, String) {
        let user = self
            .state
            .db
            .create_user(username, "not-a-real-hash")
            .expect("failed to create test user");
        let token = self.state.jwt.issue(&user).expect("failed to sign token");
        (user, token)
    }
}

// ---------- Request builders ----------

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Build a GET request to `uri` carrying `token`.
pub fn get(uri: &str, token: &str) -> Request<Body> {
    request(Method::GET, uri, Some(token), None)
}

/// Build a POST request to `uri` with a JSON body and `token`.
pub fn post_json<T: serde::Serialize>(uri: &str, token: &str, body: &T) -> Request<Body> {
    let json = serde_json::to_string(body).unwrap();
    request(Method::POST, uri, Some(token), Some(json))
}

/// Build a PUT request to `uri` with a JSON body and `token`.
pub fn put_json<T: serde::Serialize>(uri: &str, token: &str, body: &T) -> Request<Body> {
    let json = serde_json::to_string(body).unwrap();
    request(Method::PUT, uri, Some(token), Some(json))
}

/// Build a PATCH request to `uri` without a body.
pub fn patch(uri: &str, token: &str) -> Request<Body> {
    request(Method::PATCH, uri, Some(token), None)
}

/// Build a DELETE request to `uri` with `token`.
pub fn delete(uri: &str, token: &str) -> Request<Body> {
    request(Method::DELETE, uri, Some(token), None)
}

/// Build a GET request **without** a token (for testing auth rejection).
pub fn get_unauthenticated(uri: &str) -> Request<Body> {
    request(Method::GET, uri, None, None)
}

/// Build a POST request **without** a token.
pub fn post_json_unauthenticated<T: serde::Serialize>(uri: &str, body: &T) -> Request<Body> {
    let json = serde_json::to_string(body).unwrap();
    request(Method::POST, uri, None, Some(json))
}

// ---------- Response helpers ----------

/// Send a request through the router and return (status, JSON body).
pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body_bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body_bytes).to_string())
        })
    };
    (status, json)
}

/// Send a request and deserialize the body into `T`.
pub async fn send_typed<T: DeserializeOwned>(app: Router, req: Request<Body>) -> (StatusCode, T) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body_bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value: T = serde_json::from_slice(&body_bytes).unwrap_or_else(|e| {
        panic!(
            "failed to deserialize response: {e}\nbody: {}",
            String::from_utf8_lossy(&body_bytes)
        )
    });
    (status, value)
}

// ---------- Stub providers ----------

/// Provider that always answers with the same text and records its calls.
pub struct ScriptedProvider {
    answer: String,
    calls: AtomicUsize,
    last_system: Mutex<Option<String>>,
}

impl ScriptedProvider {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
            last_system: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_system_prompt(&self) -> Option<String> {
        self.last_system.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> LlmResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let system = messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.clone());
        *self.last_system.lock().unwrap() = system;
        Ok(self.answer.clone())
    }
}

/// Provider that fails every call.
pub struct FailingProvider;

#[async_trait]
impl ChatProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing-model"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> LlmResult<String> {
        Err(LlmError::ServerError {
            message: "upstream unavailable".to_string(),
            status: 503,
        })
    }
}

/// Provider that answers only after a delay.
pub struct SlowProvider {
    delay: Duration,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ChatProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    fn model(&self) -> &str {
        "slow-model"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> LlmResult<String> {
        tokio::time::sleep(self.delay).await;
        Ok("too late".to_string())
    }
}
