// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Reading config files from the global, workspace and local locations.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::TutorFileConfig;

/// Workspace config file names, first match wins.
pub const CONFIG_FILES: &[&str] = &[".tutor.json", "tutor.config.yaml"];

/// Per-directory overrides, meant to stay out of version control.
pub const LOCAL_CONFIG_FILE: &str = ".tutor.local.json";

const GLOBAL_CONFIG_DIR: &str = ".tutor";
const GLOBAL_CONFIG_FILE: &str = "config.json";
const DEFAULT_DATABASE_FILE: &str = "sessions.db";

fn global_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR))
}

/// `~/.tutor/sessions.db`, when a home directory is known.
pub fn default_database_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(DEFAULT_DATABASE_FILE))
}

pub fn load_global_config() -> Result<Option<TutorFileConfig>, ConfigError> {
    match global_config_dir() {
        Some(dir) => read_if_present(&dir.join(GLOBAL_CONFIG_FILE)),
        None => Ok(None),
    }
}

pub fn load_workspace_config(
    workspace_root: &Path,
) -> Result<Option<TutorFileConfig>, ConfigError> {
    for filename in CONFIG_FILES {
        if let Some(config) = read_if_present(&workspace_root.join(filename))? {
            return Ok(Some(config));
        }
    }
    Ok(None)
}

pub fn load_local_config(workspace_root: &Path) -> Result<Option<TutorFileConfig>, ConfigError> {
    read_if_present(&workspace_root.join(LOCAL_CONFIG_FILE))
}

fn read_if_present(path: &Path) -> Result<Option<TutorFileConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let config = if is_yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(Some(config))
}

/// Write a starter `.tutor.json` into the workspace. An existing file is left alone.
pub fn init_config(workspace_root: &Path) -> Result<PathBuf, ConfigError> {
    let path = workspace_root.join(CONFIG_FILES[0]);
    if path.exists() {
        return Err(ConfigError::InvalidValue {
            field: CONFIG_FILES[0].to_string(),
            message: "already exists".to_string(),
        });
    }
    let starter = TutorFileConfig {
        provider: Some("ollama".to_string()),
        model: Some("llama3.2".to_string()),
        history_window: Some(crate::prompt::HISTORY_WINDOW),
        ..Default::default()
    };
    std::fs::write(&path, serde_json::to_string_pretty(&starter)?)?;
    Ok(path)
}
