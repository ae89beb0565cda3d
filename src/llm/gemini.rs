//! Google Gemini `generateContent` client

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{
    missing_api_key_error, parse_http_error, ChatMessage, ChatProvider, ChatRole,
    GenerationOptions, LlmError, LlmResult,
};
use crate::config::ProviderSettings;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

pub struct GeminiProvider {
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(settings: ProviderSettings, timeout: Duration) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Other {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    /// System messages become `systemInstruction`; the rest map to contents
    fn build_request_body(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> serde_json::Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| {
                let role = if m.role == ChatRole::Assistant {
                    "model"
                } else {
                    "user"
                };
                serde_json::json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "temperature": options.temperature,
                "maxOutputTokens": options.max_tokens,
            },
        });
        if !system.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": system.join("\n\n") }]
            });
        }
        body
    }
}

fn extract_text(response: GeminiResponse) -> LlmResult<String> {
    let text: String = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    let text = text.trim();
    if text.is_empty() {
        return Err(LlmError::ParseError {
            message: "response contained no candidate text".to_string(),
        });
    }
    Ok(text.to_string())
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
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
            .ok_or_else(|| missing_api_key_error("gemini"))?;

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&self.build_request_body(messages, options))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body_text = response.text().await?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, "gemini"));
        }

        let parsed: GeminiResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(
            ProviderSettings {
                api_key: Some("g-test".to_string()),
                model: "gemini-2.0-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            provider().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_system_messages_become_instruction() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let options = GenerationOptions {
            max_tokens: 256,
            temperature: 0.5,
        };
        let body = provider().build_request_body(&messages, &options);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let parsed: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "Once "}, {"text": "upon a time."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "Once upon a time.");

        let blocked: GeminiResponse = serde_json::from_str(r#"{"candidates": [{}]}"#).unwrap();
        assert!(extract_text(blocked).is_err());
    }
}
