// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenAI-compatible generator.
//!
//! Works with OpenAI, Ollama and any endpoint that speaks the Chat
//! Completions API. Each prompt is sent as a single user message; the
//! tutoring engine rebuilds all continuity into the prompt itself.
//!
//! See [OpenAI Chat Completions API](https://platform.openai.com/docs/api-reference/chat)

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

/// Default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Ollama API base URL.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Generator backed by a Chat Completions endpoint.
pub struct OpenAIGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: Option<f32>,
    provider_name: String,
}

impl OpenAIGenerator {
    /// Create a new generator.
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        config: &GeneratorConfig,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let provider_name = Self::detect_provider_name(&base_url);

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url,
            max_tokens: config.max_tokens(),
            temperature: config.temperature,
            provider_name,
        })
    }

    /// Create a generator for a local Ollama server.
    pub fn ollama(model: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(None, model, OLLAMA_BASE_URL, &GeneratorConfig::default())
    }

    /// Report `name` instead of the one guessed from the base URL.
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Detect provider name from base URL.
    fn detect_provider_name(base_url: &str) -> String {
        if base_url.contains("openai.com") {
            "OpenAI".to_string()
        } else if base_url.contains("localhost:11434") || base_url.contains("ollama") {
            "Ollama".to_string()
        } else if base_url.contains("groq") {
            "Groq".to_string()
        } else {
            "OpenAI-Compatible".to_string()
        }
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: Some(self.max_tokens),
            temperature: self.temperature,
            stream: false,
        }
    }

    /// Map an error response from the API.
    fn handle_error_response(status_code: u16, body: &str) -> ProviderError {
        if let Ok(error) = serde_json::from_str::<ApiError>(body) {
            let message = error.error.message;
            match error.error.error_type.as_deref() {
                Some("authentication_error") | Some("invalid_api_key") => {
                    ProviderError::AuthError(message)
                }
                Some("rate_limit_error") | Some("rate_limit_exceeded") => {
                    ProviderError::RateLimited(message)
                }
                _ => ProviderError::api(message, status_code),
            }
        } else {
            match status_code {
                401 | 403 => ProviderError::AuthError(body.to_string()),
                429 => ProviderError::RateLimited(body.to_string()),
                _ => ProviderError::api(body.to_string(), status_code),
            }
        }
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = self.build_request(prompt);
        let start = Instant::now();

        debug!(model = %self.model, prompt_len = prompt.len(), "Sending chat request");

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("content-type", "application/json");

        if let Some(ref api_key) = self.api_key {
            req = req.header("authorization", format!("Bearer {}", api_key));
        }

        let response = req.json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status.as_u16(), &error_text));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("generator.openai", start.elapsed());

        let text = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            len = text.len(),
            "Chat response received"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.provider_name
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_generator_creation() {
        let generator = OpenAIGenerator::ollama("llama3.2").unwrap();
        assert_eq!(generator.name(), "Ollama");
        assert_eq!(generator.model(), "llama3.2");
    }

    #[test]
    fn test_explicit_name_wins_over_url() {
        let config = GeneratorConfig::default();
        let generator = OpenAIGenerator::new(None, "llama3.2", "http://gpu-box:11434/v1", &config)
            .unwrap()
            .with_provider_name("Ollama");
        assert_eq!(generator.name(), "Ollama");
    }

    #[test]
    fn test_provider_name_detection() {
        let detect = OpenAIGenerator::detect_provider_name;
        assert_eq!(detect("https://api.openai.com/v1"), "OpenAI");
        assert_eq!(detect("http://localhost:11434/v1"), "Ollama");
        assert_eq!(detect("https://custom.example.com"), "OpenAI-Compatible");
    }

    #[test]
    fn test_request_body_is_single_user_message() {
        let generator = OpenAIGenerator::ollama("llama3.2").unwrap();
        let body = serde_json::to_value(generator.build_request("Teach fractions")).unwrap();
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Teach fractions");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"Hello! Ready?"}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("Hello! Ready?"));
    }

    #[test]
    fn test_error_mapping() {
        let body = r#"{"error":{"message":"bad key","type":"invalid_api_key"}}"#;
        assert!(matches!(
            OpenAIGenerator::handle_error_response(401, body),
            ProviderError::AuthError(_)
        ));
        assert!(matches!(
            OpenAIGenerator::handle_error_response(429, "slow down"),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            OpenAIGenerator::handle_error_response(500, "boom"),
            ProviderError::ApiError { status_code: Some(500), .. }
        ));
    }
}
