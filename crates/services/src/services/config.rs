use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const GENERATION_API_URL_ENV: &str = "AVEE_GENERATION_API_URL";
const GENERATION_API_KEY_ENV: &str = "AVEE_GENERATION_API_KEY";
const GENERATION_TIMEOUT_ENV: &str = "AVEE_GENERATION_TIMEOUT_SECS";
const API_TOKEN_ENV: &str = "AVEE_API_TOKEN";
const LOCALHOST_BYPASS_ENV: &str = "AVEE_ALLOW_LOCALHOST_BYPASS";

const DEFAULT_GENERATION_API_URL: &str = "http://127.0.0.1:9500";
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessControlMode {
    #[default]
    Disabled,
    Token,
}

#[derive(Debug, Clone, Default)]
pub struct AccessControlConfig {
    pub mode: AccessControlMode,
    pub token: Option<String>,
    pub allow_localhost_bypass: bool,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GENERATION_API_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub access_control: AccessControlConfig,
    pub generation: GenerationConfig,
}

impl Config {
    /// Reads runtime configuration from the environment, falling back to
    /// defaults on missing or malformed values.
    pub fn from_env() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = get_env(API_TOKEN_ENV)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let mode = if token.is_some() {
            AccessControlMode::Token
        } else {
            AccessControlMode::Disabled
        };
        let allow_localhost_bypass = get_env(LOCALHOST_BYPASS_ENV)
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE"))
            .unwrap_or(false);

        let base_url = get_env(GENERATION_API_URL_ENV)
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_GENERATION_API_URL.to_string());

        let api_key = get_env(GENERATION_API_KEY_ENV)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(SecretString::from);

        let timeout = match get_env(GENERATION_TIMEOUT_ENV).map(|v| v.trim().parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
            Some(_) => {
                tracing::warn!(
                    "Invalid {GENERATION_TIMEOUT_ENV}; using default {DEFAULT_GENERATION_TIMEOUT_SECS}s"
                );
                Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS)
            }
            None => Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
        };

        Config {
            access_control: AccessControlConfig {
                mode,
                token,
                allow_localhost_bypass,
            },
            generation: GenerationConfig {
                base_url,
                api_key,
                timeout,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn token_env_switches_mode_to_token() {
        let mut envs = HashMap::new();
        envs.insert("AVEE_API_TOKEN", "sekrit".to_string());

        let config = Config::from_env_with(|key| envs.get(key).cloned());

        assert_eq!(config.access_control.mode, AccessControlMode::Token);
        assert_eq!(config.access_control.token.as_deref(), Some("sekrit"));
    }

    #[test]
    fn blank_token_is_treated_as_disabled() {
        let mut envs = HashMap::new();
        envs.insert("AVEE_API_TOKEN", "   ".to_string());

        let config = Config::from_env_with(|key| envs.get(key).cloned());

        assert_eq!(config.access_control.mode, AccessControlMode::Disabled);
        assert!(config.access_control.token.is_none());
    }

    #[test]
    fn generation_url_trims_trailing_slash() {
        let mut envs = HashMap::new();
        envs.insert(
            "AVEE_GENERATION_API_URL",
            "https://gen.example.com/".to_string(),
        );

        let config = Config::from_env_with(|key| envs.get(key).cloned());

        assert_eq!(config.generation.base_url, "https://gen.example.com");
    }

    #[test]
    fn invalid_timeout_falls_back_to_default() {
        let mut envs = HashMap::new();
        envs.insert("AVEE_GENERATION_TIMEOUT_SECS", "0".to_string());

        let config = Config::from_env_with(|key| envs.get(key).cloned());

        assert_eq!(
            config.generation.timeout.as_secs(),
            DEFAULT_GENERATION_TIMEOUT_SECS
        );
    }
}
