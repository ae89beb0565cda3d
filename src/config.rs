//! Configuration management for the mytodos server
//!
//! All configurable parameters in one place with environment variable overrides.
//! Sensible defaults for local development, explicit secrets in production.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use tracing::{info, warn};

use crate::constants::{
    DEFAULT_DEEPSEEK_BASE_URL, DEFAULT_DEEPSEEK_MODEL, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_GEMINI_MODEL, DEFAULT_MAX_TOKENS, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
    DEFAULT_POOL_SIZE, DEFAULT_PORT, DEFAULT_PROVIDER_TIMEOUT_SECS, DEFAULT_TEMPERATURE,
    DEFAULT_TOKEN_TTL_SECS, HISTORY_LIMIT,
};

fn env_flag(val: &str) -> bool {
    let v = val.to_lowercase();
    v == "true" || v == "1"
}

fn is_production_env() -> bool {
    env::var("MYTODOS_ENV")
        .map(|v| {
            let v = v.to_lowercase();
            v == "production" || v == "prod"
        })
        .unwrap_or(false)
}

/// Parse a human duration such as `24h`, `30m`, `7d`, `90s` or bare seconds
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("duration cannot be empty");
    }

    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| anyhow!("invalid duration '{raw}'"))?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        other => bail!("unknown duration unit '{other}' in '{raw}' (use s, m, h or d)"),
    };
    if value == 0 {
        bail!("duration must be positive");
    }

    Ok(Duration::from_secs(value * multiplier))
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins (empty = allow all)
    pub allowed_origins: Vec<String>,
    /// Allowed HTTP methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Whether to allow credentials
    pub allow_credentials: bool,
    /// Max age for preflight cache (seconds)
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            allow_credentials: false,
            max_age_seconds: 86400,
        }
    }
}

impl CorsConfig {
    /// Load from environment variables
    ///
    /// `MYTODOS_CORS_ORIGIN=*` keeps the permissive default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(origins) = env::var("MYTODOS_CORS_ORIGIN") {
            config.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != "*")
                .collect();
        }

        if let Ok(methods) = env::var("MYTODOS_CORS_METHODS") {
            config.allowed_methods = methods
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(val) = env::var("MYTODOS_CORS_CREDENTIALS") {
            config.allow_credentials = env_flag(&val);
        }

        if let Ok(val) = env::var("MYTODOS_CORS_MAX_AGE") {
            if let Ok(n) = val.parse() {
                config.max_age_seconds = n;
            }
        }

        if is_production_env() && config.allowed_origins.is_empty() {
            warn!("PRODUCTION WARNING: CORS allows all origins. Set MYTODOS_CORS_ORIGIN.");
        }

        config
    }

    /// Check if any origin restrictions are configured
    pub fn is_restricted(&self) -> bool {
        !self.allowed_origins.is_empty()
    }

    /// Convert to tower-http CorsLayer
    pub fn to_layer(&self) -> tower_http::cors::CorsLayer {
        use tower_http::cors::{AllowOrigin, Any, CorsLayer};

        let mut layer = CorsLayer::new();

        if self.allowed_origins.is_empty() {
            layer = layer.allow_origin(Any);
        } else {
            let valid_origins: Vec<axum::http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("CORS: Invalid origin '{}' - skipping", origin);
                        None
                    }
                })
                .collect();

            if valid_origins.is_empty() {
                tracing::error!(
                    "CORS: none of the {} configured origin(s) parsed; rejecting cross-origin requests",
                    self.allowed_origins.len()
                );
            }
            layer = layer.allow_origin(AllowOrigin::list(valid_origins));
        }

        let methods: Vec<axum::http::Method> = self
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        if methods.is_empty() {
            layer = layer.allow_methods(Any);
        } else {
            layer = layer.allow_methods(methods);
        }

        let headers: Vec<axum::http::HeaderName> = self
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        if headers.is_empty() {
            layer = layer.allow_headers(Any);
        } else {
            layer = layer.allow_headers(headers);
        }

        // Wildcard origins cannot be combined with credentials
        if self.allow_credentials && self.is_restricted() {
            layer = layer.allow_credentials(true);
        }

        layer.max_age(Duration::from_secs(self.max_age_seconds))
    }
}

/// Which language-model backend answers conversation turns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    DeepSeek,
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "deepseek" => Some(Self::DeepSeek),
            "openai" | "chatgpt" => Some(Self::OpenAi),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeepSeek => "deepseek",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

/// Credentials and overrides for one provider
#[derive(Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ProviderSettings {
    fn from_env(prefix: &str, key_var: &str, model: &str, base_url: &str) -> Self {
        Self {
            api_key: env::var(key_var).ok().filter(|k| !k.trim().is_empty()),
            model: env::var(format!("MYTODOS_{prefix}_MODEL")).unwrap_or_else(|_| model.to_string()),
            base_url: env::var(format!("MYTODOS_{prefix}_BASE_URL"))
                .unwrap_or_else(|_| base_url.to_string()),
        }
    }
}

/// Language-model configuration
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Provider used for conversation turns (default: deepseek)
    pub provider: ProviderKind,
    pub deepseek: ProviderSettings,
    pub openai: ProviderSettings,
    pub gemini: ProviderSettings,
    /// Wait before answering from the local template (default: 30s)
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Turns returned by the history listing (default: 20)
    pub history_limit: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::DeepSeek,
            deepseek: ProviderSettings {
                api_key: None,
                model: DEFAULT_DEEPSEEK_MODEL.to_string(),
                base_url: DEFAULT_DEEPSEEK_BASE_URL.to_string(),
            },
            openai: ProviderSettings {
                api_key: None,
                model: DEFAULT_OPENAI_MODEL.to_string(),
                base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            },
            gemini: ProviderSettings {
                api_key: None,
                model: DEFAULT_GEMINI_MODEL.to_string(),
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            },
            timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            history_limit: HISTORY_LIMIT,
        }
    }
}

impl AiConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("MYTODOS_AI_PROVIDER") {
            match ProviderKind::parse(&val) {
                Some(kind) => config.provider = kind,
                None => warn!("Unknown MYTODOS_AI_PROVIDER '{}', keeping deepseek", val),
            }
        }

        config.deepseek = ProviderSettings::from_env(
            "DEEPSEEK",
            "DEEPSEEK_API_KEY",
            DEFAULT_DEEPSEEK_MODEL,
            DEFAULT_DEEPSEEK_BASE_URL,
        );
        config.openai = ProviderSettings::from_env(
            "OPENAI",
            "OPENAI_API_KEY",
            DEFAULT_OPENAI_MODEL,
            DEFAULT_OPENAI_BASE_URL,
        );
        config.gemini = ProviderSettings::from_env(
            "GEMINI",
            "GEMINI_API_KEY",
            DEFAULT_GEMINI_MODEL,
            DEFAULT_GEMINI_BASE_URL,
        );

        if let Ok(val) = env::var("MYTODOS_AI_TIMEOUT") {
            match parse_duration(&val) {
                Ok(d) => config.timeout = d,
                Err(e) => warn!("Ignoring MYTODOS_AI_TIMEOUT: {}", e),
            }
        }

        if let Ok(val) = env::var("MYTODOS_AI_MAX_TOKENS") {
            if let Ok(n) = val.parse() {
                config.max_tokens = n;
            }
        }

        if let Ok(val) = env::var("MYTODOS_AI_TEMPERATURE") {
            if let Ok(t) = val.parse::<f32>() {
                config.temperature = t.clamp(0.0, 2.0);
            }
        }

        if let Ok(val) = env::var("MYTODOS_HISTORY_LIMIT") {
            if let Ok(n) = val.parse::<usize>() {
                config.history_limit = n.clamp(1, 500);
            }
        }

        config
    }

    /// Settings for the given provider
    pub fn settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::DeepSeek => &self.deepseek,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Gemini => &self.gemini,
        }
    }
}

/// Server configuration loaded from environment with defaults
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address (default: 127.0.0.1)
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// SQLite database file (default: ./mytodos.db)
    pub database_path: PathBuf,

    /// Pooled connections (default: 20)
    pub pool_size: u32,

    /// HS256 signing secret; `None` until configured
    pub jwt_secret: Option<String>,

    /// Issued token lifetime (default: 24h)
    pub jwt_ttl: Duration,

    /// Maximum concurrent requests (default: 200)
    pub max_concurrent_requests: usize,

    /// Built frontend served at `/` when set
    pub static_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset (default: info)
    pub log_level: String,

    /// Whether running in production mode
    pub is_production: bool,

    pub cors: CorsConfig,

    pub ai: AiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            database_path: PathBuf::from("./mytodos.db"),
            pool_size: DEFAULT_POOL_SIZE,
            jwt_secret: None,
            jwt_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            max_concurrent_requests: 200,
            static_dir: None,
            log_level: "info".to_string(),
            is_production: false,
            cors: CorsConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    #[allow(clippy::field_reassign_with_default)]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.is_production = is_production_env();

        if let Ok(val) = env::var("MYTODOS_HOST") {
            config.host = val;
        }

        if let Ok(val) = env::var("MYTODOS_PORT") {
            if let Ok(port) = val.parse() {
                config.port = port;
            }
        }

        if let Ok(val) = env::var("MYTODOS_DATABASE_PATH") {
            config.database_path = PathBuf::from(val);
        }

        if let Ok(val) = env::var("MYTODOS_DB_POOL_SIZE") {
            if let Ok(n) = val.parse::<u32>() {
                config.pool_size = n.max(1);
            }
        }

        config.jwt_secret = env::var("MYTODOS_JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());

        if let Ok(val) = env::var("MYTODOS_JWT_EXPIRES_IN") {
            match parse_duration(&val) {
                Ok(d) => config.jwt_ttl = d,
                Err(e) => warn!("Ignoring MYTODOS_JWT_EXPIRES_IN: {}", e),
            }
        }

        if let Ok(val) = env::var("MYTODOS_MAX_CONCURRENT") {
            if let Ok(n) = val.parse() {
                config.max_concurrent_requests = n;
            }
        }

        if let Ok(val) = env::var("MYTODOS_STATIC_DIR") {
            if !val.trim().is_empty() {
                config.static_dir = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = env::var("MYTODOS_LOG_LEVEL") {
            config.log_level = val;
        }

        config.cors = CorsConfig::from_env();
        config.ai = AiConfig::from_env();

        config
    }

    /// Reject configurations that are unsafe to serve
    pub fn validate(&self) -> Result<()> {
        if self.is_production && self.jwt_secret.is_none() {
            bail!("MYTODOS_JWT_SECRET must be set when MYTODOS_ENV=production");
        }
        if let Some(secret) = &self.jwt_secret {
            if self.is_production && secret.len() < 32 {
                bail!("MYTODOS_JWT_SECRET must be at least 32 bytes in production");
            }
        }
        if self.max_concurrent_requests == 0 {
            bail!("MYTODOS_MAX_CONCURRENT must be at least 1");
        }
        Ok(())
    }

    /// Environment label reported by `/api/status`
    pub fn env_label(&self) -> &'static str {
        if self.is_production {
            "production"
        } else {
            "development"
        }
    }

    /// Log the current configuration
    pub fn log(&self) {
        info!("Configuration:");
        info!(
            "   Mode: {}",
            if self.is_production {
                "PRODUCTION"
            } else {
                "Development"
            }
        );
        info!("   Listen: {}:{}", self.host, self.port);
        info!("   Database: {:?} (pool: {})", self.database_path, self.pool_size);
        info!("   Token lifetime: {}s", self.jwt_ttl.as_secs());
        if self.jwt_secret.is_none() {
            warn!("   JWT secret: development default (set MYTODOS_JWT_SECRET)");
        }
        info!("   Max concurrent: {}", self.max_concurrent_requests);
        match &self.static_dir {
            Some(dir) => info!("   Frontend: {:?}", dir),
            None => info!("   Frontend: not served"),
        }
        if self.cors.is_restricted() {
            info!("   CORS origins: {:?}", self.cors.allowed_origins);
        } else {
            info!("   CORS: Permissive (all origins allowed)");
        }
        let active = self.ai.settings(self.ai.provider);
        info!(
            "   AI provider: {} ({}, key {})",
            self.ai.provider.as_str(),
            active.model,
            if active.api_key.is_some() {
                "configured"
            } else {
                "missing, local fallback only"
            }
        );
        info!("   AI timeout: {}s", self.ai.timeout.as_secs());
    }
}

/// Environment variable documentation
pub fn print_env_help() {
    println!("mytodos Configuration Environment Variables:");
    println!();
    println!("  MYTODOS_ENV             - Set to 'production' or 'prod' for production mode");
    println!("  MYTODOS_HOST            - Bind address (default: 127.0.0.1, use 0.0.0.0 for Docker)");
    println!("  MYTODOS_PORT            - Server port (default: 3000)");
    println!("  MYTODOS_DATABASE_PATH   - SQLite database file (default: ./mytodos.db)");
    println!("  MYTODOS_DB_POOL_SIZE    - Pooled connections (default: 20)");
    println!("  MYTODOS_JWT_SECRET      - Token signing secret (required in production)");
    println!("  MYTODOS_JWT_EXPIRES_IN  - Token lifetime, e.g. 24h, 30m, 7d (default: 24h)");
    println!("  MYTODOS_MAX_CONCURRENT  - Max concurrent requests (default: 200)");
    println!("  MYTODOS_STATIC_DIR      - Built frontend directory served at /");
    println!("  MYTODOS_LOG_LEVEL       - Log level when RUST_LOG is unset (default: info)");
    println!();
    println!("CORS Configuration:");
    println!("  MYTODOS_CORS_ORIGIN     - Comma-separated allowed origins, '*' for all (default: all)");
    println!("  MYTODOS_CORS_METHODS    - Comma-separated allowed methods");
    println!("  MYTODOS_CORS_CREDENTIALS - Allow credentials true/false (default: false)");
    println!("  MYTODOS_CORS_MAX_AGE    - Preflight cache seconds (default: 86400)");
    println!();
    println!("Language Models:");
    println!("  MYTODOS_AI_PROVIDER     - deepseek, openai or gemini (default: deepseek)");
    println!("  DEEPSEEK_API_KEY        - DeepSeek API key");
    println!("  OPENAI_API_KEY          - OpenAI API key");
    println!("  GEMINI_API_KEY          - Gemini API key");
    println!("  MYTODOS_<P>_MODEL       - Model override per provider (P = DEEPSEEK, OPENAI, GEMINI)");
    println!("  MYTODOS_<P>_BASE_URL    - Endpoint override per provider");
    println!("  MYTODOS_AI_TIMEOUT      - Provider wait before local fallback (default: 30s)");
    println!("  MYTODOS_AI_MAX_TOKENS   - Response length bound (default: 1000)");
    println!("  MYTODOS_AI_TEMPERATURE  - Sampling temperature (default: 0.7)");
    println!("  MYTODOS_HISTORY_LIMIT   - Turns returned by history (default: 20)");
    println!();
    println!("  RUST_LOG                - Log filter (overrides MYTODOS_LOG_LEVEL)");
    println!();
}
