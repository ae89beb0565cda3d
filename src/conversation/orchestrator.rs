//! Conversation turn creation
//!
//! Validation happens before any provider call or write. The provider call
//! is bounded by a timeout; any failure is answered from the local template,
//! so turn creation only fails on bad input or storage errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::prompt::build_messages;
use super::thread::ancestor_chain;
use crate::constants::{FALLBACK_MODEL, MAX_CONVERSATION_COUNT};
use crate::errors::{AppError, Result, ValidationErrorExt};
use crate::llm::{fallback_response, ChatMessage, ChatProvider, GenerationOptions};
use crate::metrics::{AI_TURNS_TOTAL, PROVIDER_DURATION};
use crate::models::{ConversationTurn, NewTurn, TodoSnapshot};
use crate::storage::Database;
use crate::validation::{validate_query, MAX_SNAPSHOT_TODOS};

/// Unvalidated turn request as received from a client
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub query: Option<String>,
    pub todos: Option<Vec<TodoSnapshot>>,
    pub parent_id: Option<i64>,
    pub conversation_count: Option<i64>,
}

/// Request that passed the input checks
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTurn {
    pub query: String,
    pub todos: Vec<TodoSnapshot>,
    pub parent_id: Option<i64>,
    pub conversation_count: i64,
}

impl TurnRequest {
    /// Input checks, in order: presence, then the position limit
    pub fn validate(self) -> Result<ValidatedTurn> {
        let query = self
            .query
            .ok_or_else(|| AppError::invalid("query", "query is required"))?;
        validate_query(&query).map_validation_err("query")?;

        let todos = self
            .todos
            .ok_or_else(|| AppError::invalid("todos", "todos are required"))?;
        if todos.is_empty() {
            return Err(AppError::invalid("todos", "at least one todo is required"));
        }
        if todos.len() > MAX_SNAPSHOT_TODOS {
            return Err(AppError::invalid(
                "todos",
                format!("too many todos: {} (max: {})", todos.len(), MAX_SNAPSHOT_TODOS),
            ));
        }

        let conversation_count = self.conversation_count.unwrap_or(1);
        if conversation_count > MAX_CONVERSATION_COUNT {
            return Err(AppError::ConversationLimitExceeded {
                count: conversation_count,
                max: MAX_CONVERSATION_COUNT,
            });
        }
        if conversation_count < 1 {
            return Err(AppError::invalid(
                "conversation_count",
                "conversation_count starts at 1",
            ));
        }

        Ok(ValidatedTurn {
            query: query.trim().to_string(),
            todos,
            parent_id: self.parent_id,
            conversation_count,
        })
    }
}

/// Where a turn's response text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSource {
    Provider,
    Fallback,
}

impl CompletionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Fallback => "fallback",
        }
    }
}

/// Resolved answer, always concrete before persistence
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub source: CompletionSource,
}

impl Completion {
    fn fallback(todos: &[TodoSnapshot]) -> Self {
        Self {
            text: fallback_response(todos),
            model: FALLBACK_MODEL.to_string(),
            source: CompletionSource::Fallback,
        }
    }
}

/// Stored turn plus the path that produced its answer
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub turn: ConversationTurn,
    pub source: CompletionSource,
}

pub struct TurnOrchestrator {
    db: Database,
    provider: Arc<dyn ChatProvider>,
    options: GenerationOptions,
    timeout: Duration,
}

impl TurnOrchestrator {
    pub fn new(
        db: Database,
        provider: Arc<dyn ChatProvider>,
        options: GenerationOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            provider,
            options,
            timeout,
        }
    }

    /// Validate, build the prompt, ask the provider and store the turn
    pub async fn create_turn(&self, user_id: i64, request: TurnRequest) -> Result<TurnOutcome> {
        let turn = request.validate()?;

        let prior = match turn.parent_id {
            Some(parent_id) => {
                let db = self.db.clone();
                let chain =
                    tokio::task::spawn_blocking(move || ancestor_chain(&db, parent_id, user_id))
                        .await??;
                if chain.is_empty() {
                    return Err(AppError::ConversationNotFound(parent_id));
                }
                chain
            }
            None => Vec::new(),
        };

        let messages = build_messages(&turn.query, &turn.todos, &prior, turn.conversation_count);
        let completion = self.complete(&messages, &turn.todos).await;

        let new_turn = NewTurn {
            user_id,
            query: turn.query,
            todos: turn.todos,
            response: completion.text,
            model: completion.model,
            parent_id: turn.parent_id,
            conversation_count: turn.conversation_count,
        };
        let db = self.db.clone();
        let stored = tokio::task::spawn_blocking(move || db.insert_turn(&new_turn)).await??;

        AI_TURNS_TOTAL
            .with_label_values(&[completion.source.as_str()])
            .inc();
        info!(
            turn_id = stored.id,
            parent_id = ?stored.parent_id,
            position = stored.conversation_count,
            source = completion.source.as_str(),
            "conversation turn stored"
        );

        Ok(TurnOutcome {
            turn: stored,
            source: completion.source,
        })
    }

    /// Ask the provider, falling back to the template on error or timeout
    pub async fn complete(&self, messages: &[ChatMessage], todos: &[TodoSnapshot]) -> Completion {
        let provider = self.provider.name().to_string();
        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.provider.complete(messages, &self.options)).await;
        let elapsed = started.elapsed().as_secs_f64();

        let (outcome, completion) = match result {
            Ok(Ok(text)) if !text.trim().is_empty() => (
                "ok",
                Completion {
                    text,
                    model: self.provider.model().to_string(),
                    source: CompletionSource::Provider,
                },
            ),
            Ok(Ok(_)) => {
                warn!(provider = %provider, "provider returned empty text; using local template");
                ("empty", Completion::fallback(todos))
            }
            Ok(Err(e)) => {
                warn!(provider = %provider, error = %e, "provider failed; using local template");
                ("error", Completion::fallback(todos))
            }
            Err(_) => {
                warn!(
                    provider = %provider,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "provider timed out; using local template"
                );
                ("timeout", Completion::fallback(todos))
            }
        };

        PROVIDER_DURATION
            .with_label_values(&[provider.as_str(), outcome])
            .observe(elapsed);
        completion
    }
}
