//! End-to-end tests through the full router.
//!
//! Each test runs against its own on-disk SQLite database in a temp
//! directory and a stub language model, and goes through the same
//! register/login flow a browser client would.
//!
//! Run with: `cargo test --test handler_tests`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use mytodos::{
    config::ServerConfig,
    handlers::{build_router, ServerState},
    llm::{ChatMessage, ChatProvider, GenerationOptions, LlmError, LlmResult, ProviderRegistry},
    storage::Database,
};

// ═══════════════════════════════════════════════════════════════════════
// Test infrastructure
// ═══════════════════════════════════════════════════════════════════════

/// Stub model: answers with a fixed text, or fails when `healthy` is false.
struct StubModel {
    healthy: bool,
    calls: AtomicUsize,
}

impl StubModel {
    fn new(healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            healthy,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ChatProvider for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-1"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> LlmResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy {
            Ok("Buy the milk before walking the dog.".to_string())
        } else {
            Err(LlmError::RateLimited {
                message: "quota exhausted".to_string(),
            })
        }
    }
}

/// Self-contained test harness with a fresh temp directory.
struct Harness {
    app: Router,
    model: Arc<StubModel>,
    _dir: TempDir,
}

impl Harness {
    fn new(healthy: bool) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let cfg = ServerConfig {
            database_path: dir.path().join("mytodos.db"),
            pool_size: 4,
            jwt_secret: Some("integration-test-secret-at-least-32-bytes".to_string()),
            ..ServerConfig::default()
        };
        let db = Database::open(&cfg.database_path, cfg.pool_size).expect("open database");
        let model = StubModel::new(healthy);
        let state = ServerState::new(cfg, db, ProviderRegistry::single(model.clone()));
        Self {
            app: build_router(Arc::new(state)),
            model,
            _dir: dir,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Register an account and return its token.
    async fn register(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"username": username, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["token"].as_str().expect("token in body").to_string()
    }

    async fn ask(&self, token: &str, todos: &Value, parent_id: Option<i64>, count: i64) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/ai/assistance",
            Some(token),
            Some(json!({
                "query": "help me plan",
                "todos": todos,
                "parent_id": parent_id,
                "conversation_count": count,
            })),
        )
        .await
    }
}

fn ids_of(thread: &Value) -> Vec<i64> {
    thread
        .as_array()
        .expect("thread is an array")
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Scenarios
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_plan_and_follow_up() {
    let h = Harness::new(true);
    let token = h.register("alice", "pw123").await;

    let tomorrow = (Utc::now() + ChronoDuration::days(1)).date_naive().to_string();
    let (status, created) = h
        .call(
            Method::POST,
            "/api/todos",
            Some(&token),
            Some(json!({"title": "Buy milk", "priority": 1, "due_date": tomorrow})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let todos = json!([created["todo"].clone()]);

    let (status, first) = h.ask(&token, &todos, None, 1).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["conversation_count"], 1);
    assert!(first["parent_id"].is_null());
    assert!(!first["response"].as_str().unwrap().is_empty());
    let first_id = first["id"].as_i64().unwrap();

    let (status, second) = h.ask(&token, &todos, Some(first_id), 2).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["conversation_count"], 2);
    assert_eq!(second["parent_id"], first_id);
    let second_id = second["id"].as_i64().unwrap();

    for id in [first_id, second_id] {
        let (status, thread) = h
            .call(Method::GET, &format!("/api/ai/thread/{id}"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids_of(&thread), vec![first_id, second_id]);
    }
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_eleventh_round_is_rejected() {
    let h = Harness::new(true);
    let token = h.register("alice", "pw123").await;
    let todos = json!([{"title": "Buy milk"}]);

    let (_, root) = h.ask(&token, &todos, None, 1).await;
    let (status, body) = h.ask(&token, &todos, root["id"].as_i64(), 11).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CONVERSATION_LIMIT_EXCEEDED");
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 1);

    let (_, history) = h.call(Method::GET, "/api/ai/history", Some(&token), None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failing_model_still_answers() {
    let h = Harness::new(false);
    let token = h.register("alice", "pw123").await;

    let (status, turn) = h
        .ask(&token, &json!([{"title": "Walk dog", "priority": "1"}]), None, 1)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(turn["source"], "fallback");
    assert_eq!(turn["model"], "local-fallback");
    assert!(turn["response"].as_str().unwrap().contains("Walk dog"));
}

#[tokio::test]
async fn test_users_are_isolated() {
    let h = Harness::new(true);
    let alice = h.register("alice", "pw123").await;
    let bob = h.register("bob", "hunter2").await;

    let (_, todo) = h
        .call(Method::POST, "/api/todos", Some(&alice), Some(json!({"title": "Buy milk"})))
        .await;
    let todo_id = todo["todo"]["id"].as_i64().unwrap();
    let (_, turn) = h.ask(&alice, &json!([{"title": "Buy milk"}]), None, 1).await;
    let turn_id = turn["id"].as_i64().unwrap();

    let (status, _) = h
        .call(Method::GET, &format!("/api/todos/{todo_id}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h
        .call(Method::GET, &format!("/api/ai/thread/{turn_id}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Continuing someone else's conversation is refused before the model is asked
    let (status, body) = h.ask(&bob, &json!([{"title": "x"}]), Some(turn_id), 2).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "CONVERSATION_NOT_FOUND");
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 1);

    let (_, bobs) = h.call(Method::GET, "/api/todos", Some(&bob), None).await;
    assert_eq!(bobs["todos"], json!([]));
}

#[tokio::test]
async fn test_deleting_root_orphans_grandchild() {
    let h = Harness::new(true);
    let token = h.register("alice", "pw123").await;
    let todos = json!([{"title": "Buy milk"}]);

    let (_, a) = h.ask(&token, &todos, None, 1).await;
    let (_, b) = h.ask(&token, &todos, a["id"].as_i64(), 2).await;
    let (_, c) = h.ask(&token, &todos, b["id"].as_i64(), 3).await;
    let c_id = c["id"].as_i64().unwrap();

    let (status, _) = h
        .call(Method::DELETE, &format!("/api/ai/history/{}", a["id"]), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, history) = h.call(Method::GET, "/api/ai/history", Some(&token), None).await;
    assert_eq!(ids_of(&history), vec![c_id]);

    let (status, thread) = h
        .call(Method::GET, &format!("/api/ai/thread/{c_id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids_of(&thread), vec![c_id]);
}

#[tokio::test]
async fn test_protected_routes_need_a_valid_token() {
    let h = Harness::new(true);

    for (method, uri) in [
        (Method::GET, "/api/todos"),
        (Method::GET, "/api/auth/me"),
        (Method::GET, "/api/ai/history"),
        (Method::POST, "/api/ai/assistance"),
    ] {
        let (status, body) = h.call(method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["code"], "MISSING_TOKEN");
    }

    let (status, body) = h
        .call(Method::GET, "/api/todos", Some("not.a.jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");

    let (status, _) = h.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_after_password_change() {
    let h = Harness::new(true);
    let token = h.register("alice", "pw123").await;

    let (status, _) = h
        .call(Method::PUT, "/api/auth/me", Some(&token), Some(json!({"password": "new-pw"})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let login = |password: &'static str| {
        h.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": password})),
        )
    };
    let (status, _) = login("pw123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = login("new-pw").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn test_concurrent_turns_share_the_pool() {
    let h = Arc::new(Harness::new(true));
    let token = h.register("alice", "pw123").await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let h = h.clone();
        let token = token.clone();
        tasks.push(tokio::spawn(async move {
            h.ask(&token, &json!([{"title": "Buy milk"}]), None, 1).await.0
        }));
    }
    for task in tasks {
        assert_eq!(
            tokio::time::timeout(Duration::from_secs(10), task)
                .await
                .unwrap()
                .unwrap(),
            StatusCode::CREATED
        );
    }

    let (_, history) = h.call(Method::GET, "/api/ai/history", Some(&token), None).await;
    assert_eq!(history.as_array().unwrap().len(), 8);
}
