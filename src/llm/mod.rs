//! Language-model clients
//!
//! One client per supported backend, built once from `AiConfig`. The
//! registry hands out the active provider for conversation turns and any
//! provider by name for the diagnostic endpoint.

mod fallback;
mod gemini;
mod openai;
mod provider;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use fallback::fallback_response;
pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatProvider;
pub use provider::{
    missing_api_key_error, parse_http_error, ChatMessage, ChatProvider, ChatRole,
    GenerationOptions, LlmError, LlmResult,
};

use crate::config::{AiConfig, ProviderKind};

/// Providers keyed by name, plus the one that answers conversation turns
#[derive(Clone)]
pub struct ProviderRegistry {
    active: Arc<dyn ChatProvider>,
    by_name: BTreeMap<String, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    /// Build every provider from configuration
    pub fn from_config(config: &AiConfig) -> LlmResult<Self> {
        let mut by_name: BTreeMap<String, Arc<dyn ChatProvider>> = BTreeMap::new();
        by_name.insert(
            ProviderKind::DeepSeek.as_str().to_string(),
            Arc::new(OpenAiCompatProvider::deepseek(
                config.deepseek.clone(),
                config.timeout,
            )?),
        );
        by_name.insert(
            ProviderKind::OpenAi.as_str().to_string(),
            Arc::new(OpenAiCompatProvider::openai(
                config.openai.clone(),
                config.timeout,
            )?),
        );
        by_name.insert(
            ProviderKind::Gemini.as_str().to_string(),
            Arc::new(GeminiProvider::new(config.gemini.clone(), config.timeout)?),
        );

        let active = by_name
            .get(config.provider.as_str())
            .cloned()
            .ok_or_else(|| LlmError::Other {
                message: format!("provider '{}' not registered", config.provider.as_str()),
            })?;

        Ok(Self { active, by_name })
    }

    /// Registry with a single provider, used by tests and embedders
    pub fn single(provider: Arc<dyn ChatProvider>) -> Self {
        let mut by_name = BTreeMap::new();
        by_name.insert(provider.name().to_string(), provider.clone());
        Self {
            active: provider,
            by_name,
        }
    }

    pub fn active(&self) -> Arc<dyn ChatProvider> {
        self.active.clone()
    }

    /// Look up a provider by name; `chatgpt` is accepted for `openai`
    pub fn get(&self, name: &str) -> Option<Arc<dyn ChatProvider>> {
        let key = match ProviderKind::parse(name) {
            Some(kind) => kind.as_str().to_string(),
            None => name.to_lowercase(),
        };
        self.by_name.get(&key).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;

    #[test]
    fn test_registry_from_default_config() {
        let registry = ProviderRegistry::from_config(&AiConfig::default()).unwrap();
        assert_eq!(registry.active().name(), "deepseek");
        assert_eq!(registry.active().model(), "deepseek-chat");
        assert_eq!(registry.names(), vec!["deepseek", "gemini", "openai"]);
    }

    #[test]
    fn test_registry_lookup_aliases() {
        let registry = ProviderRegistry::from_config(&AiConfig::default()).unwrap();
        assert_eq!(registry.get("chatgpt").unwrap().name(), "openai");
        assert_eq!(registry.get("Gemini").unwrap().model(), "gemini-2.0-flash");
        assert!(registry.get("claude").is_none());
    }

    #[test]
    fn test_registry_respects_active_provider() {
        let config = AiConfig {
            provider: ProviderKind::OpenAi,
            ..AiConfig::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.active().model(), "gpt-4o");
    }
}
