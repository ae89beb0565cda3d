//! Input validation for request payloads
//! Keeps oversized or empty input out of storage and provider prompts

use anyhow::{anyhow, Result};

/// Maximum lengths
pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MAX_PASSWORD_LENGTH: usize = 256;
pub const MAX_TITLE_LENGTH: usize = 500;
pub const MAX_QUERY_LENGTH: usize = 4_000;
pub const MAX_SNAPSHOT_TODOS: usize = 200;

/// Validate a login handle
pub fn validate_username(username: &str) -> Result<()> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("username cannot be empty"));
    }

    if trimmed.chars().count() > MAX_USERNAME_LENGTH {
        return Err(anyhow!(
            "username too long: {} chars (max: {})",
            trimmed.chars().count(),
            MAX_USERNAME_LENGTH
        ));
    }

    if trimmed.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(anyhow!("username cannot contain whitespace or control characters"));
    }

    Ok(())
}

/// Validate a plaintext password before hashing
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(anyhow!("password cannot be empty"));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(anyhow!(
            "password too long: {} bytes (max: {})",
            password.len(),
            MAX_PASSWORD_LENGTH
        ));
    }

    Ok(())
}

/// Validate and trim a todo title
pub fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Title cannot be empty"));
    }

    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(anyhow!(
            "title too long: {} chars (max: {})",
            trimmed.chars().count(),
            MAX_TITLE_LENGTH
        ));
    }

    Ok(trimmed.to_string())
}

/// Validate the free-text query of a conversation turn
pub fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(anyhow!("query cannot be empty"));
    }

    if query.len() > MAX_QUERY_LENGTH {
        return Err(anyhow!(
            "query too long: {} bytes (max: {})",
            query.len(),
            MAX_QUERY_LENGTH
        ));
    }

    Ok(())
}

/// Validate a due date in `YYYY-MM-DD` form
///
/// A trailing time component (`2026-03-01T00:00:00Z`) is dropped.
pub fn validate_due_date(raw: &str) -> Result<chrono::NaiveDate> {
    let date_part = raw.trim().split('T').next().unwrap_or_default();
    chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid due date '{raw}': {e} (expected YYYY-MM-DD)"))
}
