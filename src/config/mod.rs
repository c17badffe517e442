// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module.
//!
//! Handles loading, merging, and validation of configuration from multiple sources:
//! - Global config: ~/.tutor/config.json
//! - Workspace config: .tutor.json or tutor.config.yaml
//! - Local config: .tutor.local.json (gitignored, for personal overrides)
//! - CLI options: command-line arguments
//!
//! Configuration is merged with precedence (CLI > local > workspace > global > defaults).

mod loader;
mod merger;
mod types;

pub use loader::{
    default_database_path, init_config, load_global_config, load_local_config,
    load_workspace_config, CONFIG_FILES, LOCAL_CONFIG_FILE,
};

pub use merger::{default_config, merge_config, CliOptions};

pub use types::{AutosaveConfig, AutosaveConfigPartial, ResolvedConfig, TutorFileConfig};

use crate::error::ConfigError;
use std::path::Path;

/// Load and merge all configuration sources for a workspace.
pub fn load_config(
    workspace_root: &Path,
    cli_options: CliOptions,
) -> Result<ResolvedConfig, ConfigError> {
    let global = load_global_config()?;
    let workspace = load_workspace_config(workspace_root)?;
    let local = load_local_config(workspace_root)?;

    Ok(merge_config(global, workspace, local, cli_options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_with_no_files() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), CliOptions::default()).unwrap();
        assert!(!config.provider.is_empty());
    }

    #[test]
    fn test_load_config_cli_override() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".tutor.json"), r#"{"provider": "openai"}"#).unwrap();

        let cli = CliOptions {
            provider: Some("ollama".to_string()),
            ..Default::default()
        };

        let config = load_config(temp.path(), cli).unwrap();
        assert_eq!(config.provider, "ollama");
    }

    #[test]
    fn test_load_config_local_overrides_workspace() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".tutor.json"), r#"{"model": "team"}"#).unwrap();
        std::fs::write(temp.path().join(LOCAL_CONFIG_FILE), r#"{"model": "mine"}"#).unwrap();

        let config = load_config(temp.path(), CliOptions::default()).unwrap();
        assert_eq!(config.model.as_deref(), Some("mine"));
    }
}
