//! Small helpers shared across handlers

use axum::extract::{rejection::JsonRejection, FromRequest, Request};

use crate::errors::{AppError, Result};

/// JSON request body whose rejections use the regular error shape
///
/// A body that fails to parse or has a field of the wrong type answers
/// 400 `INVALID_INPUT` like any other validation failure.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Parse a numeric path segment
///
/// Ids are taken from the path as strings so a malformed id yields the
/// usual JSON error body instead of axum's plain-text rejection.
pub fn parse_id(raw: &str, field: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::invalid(field, format!("Invalid {field}: '{raw}'")))
}

/// Interpret a loose boolean query flag (`true`, `1`, `yes`)
pub fn is_truthy(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "todo_id").unwrap(), 42);
        assert_eq!(parse_id("abc", "todo_id").unwrap_err().code(), "INVALID_INPUT");
        assert!(parse_id("0", "todo_id").is_err());
        assert!(parse_id("-3", "todo_id").is_err());
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(Some("true")));
        assert!(is_truthy(Some("1")));
        assert!(!is_truthy(Some("false")));
        assert!(!is_truthy(None));
    }
}
