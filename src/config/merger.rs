// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.

use std::path::PathBuf;

use super::types::{ResolvedConfig, TutorFileConfig};

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub database_path: Option<PathBuf>,
    pub no_autosave: bool,
}

/// Default configuration values.
pub fn default_config() -> ResolvedConfig {
    ResolvedConfig::default()
}

/// Merge multiple configurations with precedence.
///
/// Precedence (highest to lowest):
/// 1. CLI options
/// 2. Local config (.tutor.local.json)
/// 3. Workspace config (.tutor.json)
/// 4. Global config (~/.tutor/config.json)
/// 5. Default values
pub fn merge_config(
    global: Option<TutorFileConfig>,
    workspace: Option<TutorFileConfig>,
    local: Option<TutorFileConfig>,
    cli: CliOptions,
) -> ResolvedConfig {
    let mut result = default_config();

    for config in [global, workspace, local].into_iter().flatten() {
        apply_file_config(&mut result, &config);
    }

    apply_cli_options(&mut result, &cli);

    result
}

fn apply_file_config(result: &mut ResolvedConfig, config: &TutorFileConfig) {
    if let Some(ref provider) = config.provider {
        result.provider = provider.clone();
    }

    if config.model.is_some() {
        result.model = config.model.clone();
    }

    if config.base_url.is_some() {
        result.base_url = config.base_url.clone();
    }

    if config.database_path.is_some() {
        result.database_path = config.database_path.clone();
    }

    if config.credits_path.is_some() {
        result.credits_path = config.credits_path.clone();
    }

    // A zero window would send prompts with no transcript at all.
    if let Some(window) = config.history_window.filter(|w| *w > 0) {
        result.history_window = window;
    }

    if let Some(language) = config.language {
        result.language = language;
    }

    if let Some(difficulty) = config.difficulty {
        result.difficulty = difficulty;
    }

    if let Some(mode) = config.learning_mode {
        result.learning_mode = mode;
    }

    if let Some(ref autosave) = config.autosave {
        result.autosave.apply(autosave);
    }
}

fn apply_cli_options(result: &mut ResolvedConfig, cli: &CliOptions) {
    if let Some(ref provider) = cli.provider {
        result.provider = provider.clone();
    }

    if cli.model.is_some() {
        result.model = cli.model.clone();
    }

    if cli.base_url.is_some() {
        result.base_url = cli.base_url.clone();
    }

    if cli.database_path.is_some() {
        result.database_path = cli.database_path.clone();
    }

    if cli.no_autosave {
        result.autosave.enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::AutosaveConfigPartial;
    use crate::types::Difficulty;

    #[test]
    fn test_merge_defaults() {
        let config = merge_config(None, None, None, CliOptions::default());
        assert_eq!(config, ResolvedConfig::default());
    }

    #[test]
    fn test_merge_precedence() {
        let global = TutorFileConfig {
            provider: Some("openai".to_string()),
            model: Some("gpt-4o".to_string()),
            difficulty: Some(Difficulty::Medium),
            ..Default::default()
        };
        let workspace = TutorFileConfig {
            model: Some("gpt-4o-mini".to_string()),
            ..Default::default()
        };
        let local = TutorFileConfig {
            difficulty: Some(Difficulty::Advanced),
            ..Default::default()
        };
        let cli = CliOptions {
            provider: Some("ollama".to_string()),
            ..Default::default()
        };

        let config = merge_config(Some(global), Some(workspace), Some(local), cli);
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.difficulty, Difficulty::Advanced);
    }

    #[test]
    fn test_zero_history_window_ignored() {
        let workspace = TutorFileConfig {
            history_window: Some(0),
            ..Default::default()
        };
        let config = merge_config(None, Some(workspace), None, CliOptions::default());
        assert_eq!(config.history_window, 10);
    }

    #[test]
    fn test_autosave_merge_and_cli_disable() {
        let workspace = TutorFileConfig {
            autosave: Some(AutosaveConfigPartial {
                cooldown_secs: Some(3),
                ..Default::default()
            }),
            ..Default::default()
        };
        let cli = CliOptions {
            no_autosave: true,
            ..Default::default()
        };

        let config = merge_config(None, Some(workspace), None, cli);
        assert_eq!(config.autosave.cooldown_secs, 3);
        assert!(!config.autosave.enabled);
    }
}
