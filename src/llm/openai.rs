//! OpenAI-compatible chat completions client
//!
//! Serves both OpenAI and DeepSeek, which share the wire format and differ
//! only in endpoint, key and default model.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::provider::{
    missing_api_key_error, parse_http_error, ChatMessage, ChatProvider, GenerationOptions,
    LlmError, LlmResult,
};
use crate::config::ProviderSettings;

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiCompatProvider {
    name: &'static str,
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(name: &'static str, settings: ProviderSettings, timeout: Duration) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Other {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            name,
            settings,
            client,
        })
    }

    pub fn openai(settings: ProviderSettings, timeout: Duration) -> LlmResult<Self> {
        Self::new("openai", settings, timeout)
    }

    pub fn deepseek(settings: ProviderSettings, timeout: Duration) -> LlmResult<Self> {
        Self::new("deepseek", settings, timeout)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: &GenerationOptions,
    ) -> OpenAIRequest<'a> {
        OpenAIRequest {
            model: &self.settings.model,
            messages: messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: false,
        }
    }
}

/// First non-empty choice text
fn extract_content(response: OpenAIResponse) -> LlmResult<String> {
    response
        .choices
        .into_iter()
        .filter_map(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
        .ok_or_else(|| LlmError::ParseError {
            message: "response contained no message content".to_string(),
        })
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> LlmResult<String> {
        let api_key = self
            .settings
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error(self.name))?;

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&self.build_request(messages, options))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body_text = response.text().await?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, self.name));
        }

        let parsed: OpenAIResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        extract_content(parsed)
    }
}
