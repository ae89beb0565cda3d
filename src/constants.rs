//! Documented constants for the todo and conversation service
//!
//! Tunable values live here so handlers and the orchestrator never carry
//! magic numbers.

// =============================================================================
// CONVERSATION THREADING
// =============================================================================

/// Highest allowed position counter within one conversation chain
///
/// A continuation claiming position 11 or more is rejected before any
/// provider call or write happens.
pub const MAX_CONVERSATION_COUNT: i64 = 10;

/// Number of turns returned by the history listing
pub const HISTORY_LIMIT: usize = 20;

/// Upper bound on parent hops while searching for a thread root
///
/// Chains are capped at `MAX_CONVERSATION_COUNT` turns by the orchestrator,
/// but rows written by older clients or by hand may be longer or cyclic.
pub const MAX_PARENT_HOPS: usize = 256;

// =============================================================================
// LANGUAGE MODEL DEFAULTS
// =============================================================================

/// Default model names per provider
pub const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Default API endpoints
pub const DEFAULT_DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model name recorded on turns answered by the local template
pub const FALLBACK_MODEL: &str = "local-fallback";

/// Sampling temperature sent with every completion request
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Response length bound sent with every completion request
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Seconds to wait for a provider before answering from the template
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Prompt used by the provider diagnostic endpoint
pub const DIAGNOSTIC_PROMPT: &str = "Write a one-sentence bedtime story about a unicorn.";

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Token lifetime when `MYTODOS_JWT_EXPIRES_IN` is unset (24 hours)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Signing secret used outside production when none is configured
pub const DEV_JWT_SECRET: &str = "mytodos-development-secret-change-me";

// =============================================================================
// SERVER
// =============================================================================

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Default connection pool size
pub const DEFAULT_POOL_SIZE: u32 = 20;

/// Seconds allowed for in-flight requests to drain on shutdown
pub const GRACEFUL_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
