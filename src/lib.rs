//! MyTodos Library
//!
//! Personal todo service with accounts, bearer-token auth and threaded
//! AI suggestions about a user's todos.
//!
//! # Key Features
//! - SQLite storage behind a connection pool, every query scoped to its owner
//! - Conversation threads: each turn may continue an earlier one, and the
//!   chain of turns leading to it is replayed to the model as context
//! - DeepSeek, OpenAI and Gemini clients behind one trait, with a local
//!   template answer whenever the model fails or times out

pub mod auth;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod errors;
pub mod handlers;
pub mod llm;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod storage;
pub mod tracing_setup;
pub mod validation;

// Re-export dependencies to ensure tests use the same version
pub use chrono;
