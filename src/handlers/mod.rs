//! HTTP API Handlers - Modular organization of the REST API
//!
//! Each submodule handles a specific domain of functionality.

// Core modules
pub mod router;
pub mod state;

// Health and utilities
pub mod health;
pub mod utils;

// Accounts
pub mod users;

// Task management
pub mod todos;

// AI conversations
pub mod ai;

// Test utilities (compiled only in test builds)
#[cfg(test)]
pub mod test_helpers;

// Re-export commonly used items
pub use router::{build_protected_routes, build_public_routes, build_router};
pub use state::{AppState, ServerState};
