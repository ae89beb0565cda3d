//! Console logging setup
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! crate and `warn` to dependencies.

use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(level: &str) -> String {
    format!("warn,mytodos={level},mytodos_server={level},tower_http={level}")
}

/// Install the global subscriber
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(level)))
        .map_err(|e| anyhow!("invalid log filter: {e}"))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = default_filter("debug");
        assert!(filter.contains("mytodos=debug"));
        assert!(EnvFilter::try_new(filter).is_ok());
    }
}
