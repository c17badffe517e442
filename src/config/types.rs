// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! Defines the structure of file and resolved configuration,
//! supporting JSON and YAML formats.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{Difficulty, LearningMode, TeachingLanguage};

/// Configuration as written in a config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorFileConfig {
    /// Provider to use (anthropic, openai, ollama, openai-compatible)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Model name to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Custom base URL for the generation API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Path of the SQLite session database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Path of the JSONL credit ledger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_path: Option<PathBuf>,

    /// Number of transcript lines sent with each continuation prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_window: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<TeachingLanguage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_mode: Option<LearningMode>,

    /// Autosave overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autosave: Option<AutosaveConfigPartial>,
}

/// Autosave settings as written in a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveConfigPartial {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_messages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown_min_messages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_min_messages: Option<usize>,
}

/// Resolved autosave settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveConfig {
    /// Whether periodic autosave runs at all.
    pub enabled: bool,
    /// Background tick interval in seconds.
    pub interval_secs: u64,
    /// Window in which a save with an unchanged message count is skipped.
    pub cooldown_secs: u64,
    /// Periodic autosave starts once this many messages exist.
    pub min_messages: usize,
    /// Periodic autosave fires when the count is a multiple of this.
    pub round_size: usize,
    /// Teardown save runs when at least this many messages exist.
    pub teardown_min_messages: usize,
    /// Reset performs a final save when at least this many messages exist.
    pub reset_min_messages: usize,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            cooldown_secs: 10,
            min_messages: 6,
            round_size: 4,
            teardown_min_messages: 3,
            reset_min_messages: 4,
        }
    }
}

impl AutosaveConfig {
    pub(super) fn apply(&mut self, partial: &AutosaveConfigPartial) {
        if let Some(v) = partial.enabled {
            self.enabled = v;
        }
        if let Some(v) = partial.interval_secs {
            self.interval_secs = v;
        }
        if let Some(v) = partial.cooldown_secs {
            self.cooldown_secs = v;
        }
        if let Some(v) = partial.min_messages {
            self.min_messages = v;
        }
        if let Some(v) = partial.round_size {
            self.round_size = v;
        }
        if let Some(v) = partial.teardown_min_messages {
            self.teardown_min_messages = v;
        }
        if let Some(v) = partial.reset_min_messages {
            self.reset_min_messages = v;
        }
    }
}

/// Fully resolved configuration with defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// `None` means the default location under the global config dir.
    pub database_path: Option<PathBuf>,
    /// `None` means credits are only logged.
    pub credits_path: Option<PathBuf>,
    pub history_window: usize,
    pub language: TeachingLanguage,
    pub difficulty: Difficulty,
    pub learning_mode: LearningMode,
    pub autosave: AutosaveConfig,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: None,
            base_url: None,
            database_path: None,
            credits_path: None,
            history_window: crate::prompt::HISTORY_WINDOW,
            language: TeachingLanguage::default(),
            difficulty: Difficulty::default(),
            learning_mode: LearningMode::default(),
            autosave: AutosaveConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_defaults() {
        let config = ResolvedConfig::default();
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.history_window, 10);
        assert_eq!(config.autosave.cooldown_secs, 10);
        assert_eq!(config.autosave.min_messages, 6);
        assert_eq!(config.autosave.round_size, 4);
    }

    #[test]
    fn test_file_config_yaml() {
        let yaml = r#"
provider: ollama
model: llama3.2
language: hindi
autosave:
  cooldownSecs: 5
  roundSize: 2
"#;
        let config: TutorFileConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.as_deref(), Some("ollama"));
        assert_eq!(config.language, Some(TeachingLanguage::Hindi));

        let autosave = config.autosave.unwrap();
        assert_eq!(autosave.cooldown_secs, Some(5));
        assert_eq!(autosave.round_size, Some(2));
        assert_eq!(autosave.enabled, None);
    }

    #[test]
    fn test_autosave_apply_partial() {
        let mut autosave = AutosaveConfig::default();
        autosave.apply(&AutosaveConfigPartial {
            enabled: Some(false),
            min_messages: Some(8),
            ..Default::default()
        });
        assert!(!autosave.enabled);
        assert_eq!(autosave.min_messages, 8);
        assert_eq!(autosave.round_size, 4);
    }
}
