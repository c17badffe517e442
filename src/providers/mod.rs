// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Content-generation backends.
//!
//! Implementations of the [`Generator`](crate::types::Generator) trait:
//!
//! - [`anthropic::AnthropicGenerator`] - Claude models via the Anthropic API
//! - [`openai::OpenAIGenerator`] - OpenAI, Ollama, and OpenAI-compatible APIs
//!
//! # Quick Start
//!
//! ```bash
//! # For Anthropic Claude
//! export ANTHROPIC_API_KEY=your-key
//!
//! # For OpenAI
//! export OPENAI_API_KEY=your-key
//!
//! # For Ollama nothing is needed; it is the fallback
//! ```
//!
//! ```rust,ignore
//! use tutor::providers::create_generator_from_env;
//!
//! let generator = create_generator_from_env()?;
//! let text = generator.generate("Say hello").await?;
//! ```

pub mod anthropic;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

pub use anthropic::AnthropicGenerator;
pub use openai::OpenAIGenerator;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use crate::types::SharedGenerator;

/// Default max tokens per generation.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Supported provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// Anthropic Claude models
    Anthropic,
    /// OpenAI GPT models
    OpenAI,
    /// Ollama local models
    Ollama,
    /// Any OpenAI-compatible API
    OpenAICompatible,
}

impl ProviderType {
    /// Get the default model for this provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::OpenAI => "gpt-4o",
            Self::Ollama => "llama3.2",
            Self::OpenAICompatible => "gpt-4o",
        }
    }

    /// Get the default base URL for this provider.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => anthropic::ANTHROPIC_BASE_URL,
            Self::OpenAI => openai::OPENAI_BASE_URL,
            Self::Ollama => openai::OLLAMA_BASE_URL,
            Self::OpenAICompatible => openai::OPENAI_BASE_URL,
        }
    }

    /// Check if this provider requires an API key.
    pub fn requires_api_key(&self) -> bool {
        match self {
            Self::Anthropic | Self::OpenAI => true,
            Self::Ollama | Self::OpenAICompatible => false,
        }
    }

    /// Environment variable holding the API key, if the provider uses one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::OpenAI | Self::OpenAICompatible => Some("OPENAI_API_KEY"),
            Self::Ollama => None,
        }
    }
}

/// Error type for parsing a provider type from a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProviderTypeError;

impl std::fmt::Display for ParseProviderTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid provider type")
    }
}

impl std::error::Error for ParseProviderTypeError {}

impl std::str::FromStr for ProviderType {
    type Err = ParseProviderTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "gpt" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "openai-compatible" | "openai_compatible" => Ok(Self::OpenAICompatible),
            _ => Err(ParseProviderTypeError),
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "Anthropic"),
            Self::OpenAI => write!(f, "OpenAI"),
            Self::Ollama => write!(f, "Ollama"),
            Self::OpenAICompatible => write!(f, "OpenAI-Compatible"),
        }
    }
}

/// Settings shared by all generators.
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_ms: Option<u64>,
}

impl GeneratorConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            model: Some(model.into()),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub(crate) fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

/// Create a generator from type and configuration.
///
/// # Errors
///
/// Returns [`ProviderError::NotConfigured`] if a required API key or base URL is missing.
pub fn create_generator(
    provider_type: ProviderType,
    config: GeneratorConfig,
) -> Result<SharedGenerator, ProviderError> {
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| provider_type.default_model().to_string());

    match provider_type {
        ProviderType::Anthropic => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ProviderError::NotConfigured("API key required for Anthropic".to_string())
            })?;
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| provider_type.default_base_url().to_string());

            Ok(Arc::new(AnthropicGenerator::new(api_key, model, base_url, &config)?))
        }
        ProviderType::OpenAI => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ProviderError::NotConfigured("API key required for OpenAI".to_string())
            })?;
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| provider_type.default_base_url().to_string());

            let generator = OpenAIGenerator::new(Some(api_key), model, base_url, &config)?;
            Ok(Arc::new(generator.with_provider_name(provider_type.to_string())))
        }
        ProviderType::Ollama => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| provider_type.default_base_url().to_string());

            let generator = OpenAIGenerator::new(None, model, base_url, &config)?;
            Ok(Arc::new(generator.with_provider_name(provider_type.to_string())))
        }
        ProviderType::OpenAICompatible => {
            let base_url = config.base_url.clone().ok_or_else(|| {
                ProviderError::NotConfigured("base_url required for OpenAI-Compatible".to_string())
            })?;

            Ok(Arc::new(OpenAIGenerator::new(
                config.api_key.clone(),
                model,
                base_url,
                &config,
            )?))
        }
    }
}

/// Create a generator from environment variables.
///
/// # Detection Order
///
/// 1. `TUTOR_PROVIDER` for explicit selection
/// 2. `ANTHROPIC_API_KEY` → Anthropic
/// 3. `OPENAI_API_KEY` → OpenAI
/// 4. Ollama otherwise
///
/// `TUTOR_MODEL` overrides the model; `OLLAMA_BASE_URL`, `OPENAI_BASE_URL`
/// and `ANTHROPIC_BASE_URL` override endpoints.
pub fn create_generator_from_env() -> Result<SharedGenerator, ProviderError> {
    let provider_type = std::env::var("TUTOR_PROVIDER")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(|| {
            if std::env::var("ANTHROPIC_API_KEY").is_ok() {
                ProviderType::Anthropic
            } else if std::env::var("OPENAI_API_KEY").is_ok() {
                ProviderType::OpenAI
            } else {
                ProviderType::Ollama
            }
        });

    let base_url_env = match provider_type {
        ProviderType::Anthropic => "ANTHROPIC_BASE_URL",
        ProviderType::OpenAI | ProviderType::OpenAICompatible => "OPENAI_BASE_URL",
        ProviderType::Ollama => "OLLAMA_BASE_URL",
    };

    let config = GeneratorConfig {
        api_key: provider_type
            .api_key_env()
            .and_then(|var| std::env::var(var).ok()),
        model: std::env::var("TUTOR_MODEL").ok(),
        base_url: std::env::var(base_url_env).ok(),
        ..Default::default()
    };

    create_generator(provider_type, config)
}

/// Create a generator from a resolved configuration.
///
/// API keys always come from the environment, never from config files.
pub fn create_generator_from_config(
    config: &ResolvedConfig,
) -> Result<SharedGenerator, ProviderError> {
    let provider_type: ProviderType = config.provider.parse().map_err(|_| {
        ProviderError::NotConfigured(format!("Unknown provider: {}", config.provider))
    })?;

    let generator_config = GeneratorConfig {
        api_key: provider_type
            .api_key_env()
            .and_then(|var| std::env::var(var).ok()),
        model: config.model.clone(),
        base_url: config.base_url.clone(),
        ..Default::default()
    };

    create_generator(provider_type, generator_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_from_str() {
        assert_eq!("anthropic".parse::<ProviderType>(), Ok(ProviderType::Anthropic));
        assert_eq!("claude".parse::<ProviderType>(), Ok(ProviderType::Anthropic));
        assert_eq!("OPENAI".parse::<ProviderType>(), Ok(ProviderType::OpenAI));
        assert_eq!("ollama".parse::<ProviderType>(), Ok(ProviderType::Ollama));
        assert_eq!(
            "openai-compatible".parse::<ProviderType>(),
            Ok(ProviderType::OpenAICompatible)
        );
        assert!("invalid".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_provider_type_requires_api_key() {
        assert!(ProviderType::Anthropic.requires_api_key());
        assert!(ProviderType::OpenAI.requires_api_key());
        assert!(!ProviderType::Ollama.requires_api_key());
        assert_eq!(ProviderType::Ollama.api_key_env(), None);
    }

    #[test]
    fn test_create_generator_missing_key() {
        let result = create_generator(ProviderType::Anthropic, GeneratorConfig::default());
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn test_create_generator_compatible_needs_base_url() {
        let result = create_generator(ProviderType::OpenAICompatible, GeneratorConfig::default());
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn test_create_generators() {
        let anthropic = create_generator(
            ProviderType::Anthropic,
            GeneratorConfig::new("key", "claude-sonnet-4-20250514"),
        )
        .unwrap();
        assert_eq!(anthropic.name(), "Anthropic");

        let openai =
            create_generator(ProviderType::OpenAI, GeneratorConfig::new("key", "gpt-4o")).unwrap();
        assert_eq!(openai.name(), "OpenAI");

        let ollama = create_generator(
            ProviderType::Ollama,
            GeneratorConfig::default().with_model("llama3.2"),
        )
        .unwrap();
        assert_eq!(ollama.name(), "Ollama");
    }

    #[test]
    fn test_create_from_config_unknown_provider() {
        let config = ResolvedConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_generator_from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_create_from_config_ollama() {
        let config = ResolvedConfig {
            provider: "ollama".to_string(),
            base_url: Some("http://gpu-box:11434/v1".to_string()),
            ..Default::default()
        };
        let generator = create_generator_from_config(&config).unwrap();
        assert_eq!(generator.name(), "Ollama");
    }
}
