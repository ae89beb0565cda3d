//! AI conversation threading
//!
//! Turns form parent-linked chains rooted at an initial query. `thread`
//! rebuilds a conversation from any member, `prompt` turns a conversation
//! into provider messages and `orchestrator` creates new turns.

mod orchestrator;
mod prompt;
mod thread;

pub use orchestrator::{
    Completion, CompletionSource, TurnOrchestrator, TurnOutcome, TurnRequest, ValidatedTurn,
};
pub use prompt::{build_messages, system_prompt, user_prompt};
pub use thread::{ancestor_chain, find_root, resolve_thread};
