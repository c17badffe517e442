// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Anthropic Claude generator.
//!
//! See [Anthropic Messages API](https://docs.anthropic.com/en/api/messages) for details.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use crate::error::ProviderError;
use crate::types::Generator;

use super::GeneratorConfig;

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default Anthropic API base URL.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Generator backed by the Anthropic Messages API.
pub struct AnthropicGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl AnthropicGenerator {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        config: &GeneratorConfig,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: &str) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![RequestMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
        }
    }

    fn handle_error_response(status_code: u16, body: &str) -> ProviderError {
        if let Ok(error) = serde_json::from_str::<ApiError>(body) {
            match error.error.error_type.as_str() {
                "authentication_error" | "permission_error" => {
                    ProviderError::AuthError(error.error.message)
                }
                "rate_limit_error" => ProviderError::RateLimited(error.error.message),
                "overloaded_error" => ProviderError::RateLimited("API overloaded".to_string()),
                _ => ProviderError::api(error.error.message, status_code),
            }
        } else {
            ProviderError::api(body.to_string(), status_code)
        }
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = self.build_request(prompt);
        let start = Instant::now();

        debug!(model = %self.model, prompt_len = prompt.len(), "Sending messages request");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status.as_u16(), &error_text));
        }

        let api_response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("generator.anthropic", start.elapsed());

        let text: String = api_response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            len = text.len(),
            "Messages response received"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        "Anthropic"
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<RequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> AnthropicGenerator {
        AnthropicGenerator::new(
            "test-key",
            "claude-sonnet-4-20250514",
            ANTHROPIC_BASE_URL,
            &GeneratorConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_generator_creation() {
        let generator = generator();
        assert_eq!(generator.name(), "Anthropic");
        assert_eq!(generator.model(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(generator().build_request("Teach plants")).unwrap();
        assert_eq!(body["messages"][0]["content"], "Teach plants");
        assert!(body["max_tokens"].as_u64().unwrap() > 0);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_response_text_blocks_are_joined() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "Hello. "},
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Ready?"}
            ]
        }"#;
        let response: MessagesResponse = serde_json::from_str(json).unwrap();
        let texts: Vec<_> = response
            .content
            .into_iter()
            .filter_map(|b| match b {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect();
        assert_eq!(texts.join(""), "Hello. Ready?");
    }

    #[test]
    fn test_error_mapping() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = AnthropicGenerator::handle_error_response(529, body);
        assert!(matches!(err, ProviderError::RateLimited(_)));
        assert!(err.is_retryable());

        let body =
            r#"{"type":"error","error":{"type":"authentication_error","message":"bad key"}}"#;
        assert!(matches!(
            AnthropicGenerator::handle_error_response(401, body),
            ProviderError::AuthError(_)
        ));
    }
}
