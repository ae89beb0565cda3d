//! Shared server state
//!
//! Built once at start-up and handed to every handler through `State`.
//! Nothing in here is mutable; the connection pool is the only shared
//! resource.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::auth::JwtKeys;
use crate::config::ServerConfig;
use crate::constants::DEV_JWT_SECRET;
use crate::conversation::TurnOrchestrator;
use crate::errors::AppError;
use crate::llm::{GenerationOptions, ProviderRegistry};
use crate::storage::Database;

pub struct ServerState {
    pub db: Database,
    pub jwt: JwtKeys,
    pub providers: ProviderRegistry,
    pub orchestrator: TurnOrchestrator,
    pub config: ServerConfig,
}

impl ServerState {
    /// Assemble state from already-built parts
    pub fn new(config: ServerConfig, db: Database, providers: ProviderRegistry) -> Self {
        let secret = match &config.jwt_secret {
            Some(secret) => secret.clone(),
            None => {
                warn!("MYTODOS_JWT_SECRET not set - using development secret (not for production!)");
                DEV_JWT_SECRET.to_string()
            }
        };
        let jwt = JwtKeys::new(secret.as_bytes(), config.jwt_ttl);

        let orchestrator = TurnOrchestrator::new(
            db.clone(),
            providers.active(),
            GenerationOptions {
                max_tokens: config.ai.max_tokens,
                temperature: config.ai.temperature,
            },
            config.ai.timeout,
        );

        Self {
            db,
            jwt,
            providers,
            orchestrator,
            config,
        }
    }

    /// Open the database and build provider clients from configuration
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        info!("Opening database at {:?}", config.database_path);
        let db = Database::open(&config.database_path, config.pool_size)
            .map_err(|e| anyhow::anyhow!(e.message()))
            .context("failed to open database")?;

        let providers = ProviderRegistry::from_config(&config.ai)
            .context("failed to build language-model clients")?;

        Ok(Self::new(config, db, providers))
    }

    /// Run a blocking database closure off the async workers
    pub async fn with_db<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Database) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}

/// Application state type alias
pub type AppState = Arc<ServerState>;
