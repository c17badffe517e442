// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the tutoring engine.
//!
//! This module provides strongly-typed errors for each external collaborator
//! (generation service, session store, credit ledger, config files), using
//! `thiserror` for ergonomic error definitions and `anyhow` for error propagation.
//!
//! Only [`TutorError`] ever reaches a caller of the engine. Store and ledger
//! failures during autosave or completion are logged and swallowed.

use thiserror::Error;

/// Errors that can occur while calling the content-generation service.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Response parsing error: {0}")]
    ParseError(String),

    #[error("Empty response from generation service")]
    EmptyResponse,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl ProviderError {
    /// Create an API error with status code.
    pub fn api(message: impl Into<String>, status_code: u16) -> Self {
        Self::ApiError {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create an API error without status code.
    pub fn api_message(message: impl Into<String>) -> Self {
        Self::ApiError {
            message: message.into(),
            status_code: None,
        }
    }

    /// Check if this error is worth retrying from the presentation layer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::NetworkError(_) | Self::Timeout(_) | Self::EmptyResponse
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(0)
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

/// Errors that can occur during session store operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Failed to save session: {0}")]
    SaveFailed(String),

    #[error("Failed to load session: {0}")]
    LoadFailed(String),

    #[error("Session corrupted: {0}")]
    Corrupted(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupted(err.to_string())
    }
}

/// Errors raised by the rewards/credit ledger.
#[derive(Error, Debug)]
pub enum CreditError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Credit rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for CreditError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CreditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Rejected(err.to_string())
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Errors surfaced to callers of the lesson and session APIs.
#[derive(Error, Debug)]
pub enum TutorError {
    #[error("Could not continue the lesson: {0}")]
    Generation(#[from] ProviderError),

    #[error("Session store error: {0}")]
    Persistence(#[from] SessionError),

    #[error("Saved session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl TutorError {
    /// Whether the presentation layer should offer a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Generation(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_retryable() {
        assert!(ProviderError::RateLimited("wait 1s".to_string()).is_retryable());
        assert!(ProviderError::NetworkError("reset".to_string()).is_retryable());
        assert!(ProviderError::Timeout(30000).is_retryable());
        assert!(ProviderError::EmptyResponse.is_retryable());
        assert!(!ProviderError::AuthError("invalid key".to_string()).is_retryable());
    }

    #[test]
    fn test_provider_error_api() {
        let err = ProviderError::api("Bad request", 400);
        match err {
            ProviderError::ApiError { message, status_code } => {
                assert_eq!(message, "Bad request");
                assert_eq!(status_code, Some(400));
            }
            _ => panic!("Expected ApiError"),
        }
    }

    #[test]
    fn test_tutor_error_from_provider() {
        let err: TutorError = ProviderError::NetworkError("down".to_string()).into();
        assert!(matches!(err, TutorError::Generation(_)));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Could not continue the lesson"));
    }

    #[test]
    fn test_session_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SessionError = io_err.into();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[test]
    fn test_config_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("invalid json");
        let config_err: ConfigError = result.unwrap_err().into();
        assert!(matches!(config_err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_persistence_not_retryable() {
        let err: TutorError = SessionError::LoadFailed("disk".to_string()).into();
        assert!(!err.is_retryable());
    }
}
