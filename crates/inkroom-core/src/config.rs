//! Session configuration.

use crate::canvas::DEFAULT_ERASER_TOLERANCE;
use crate::elements::DEFAULT_TEXT_SIZE;
use crate::sync::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `server_url`.
pub const SERVER_URL_ENV: &str = "INKROOM_SERVER_URL";
/// Environment variable overriding `api_base_url`.
pub const API_URL_ENV: &str = "INKROOM_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid url `{0}`")]
    InvalidUrl(String),
}

/// Settings of a canvas session. Every field has a default, so a config file
/// only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// WebSocket endpoint of the relay.
    pub server_url: String,
    /// Base URL of the canvas REST API.
    pub api_base_url: String,
    /// Minimum spacing of drawing updates sent during pointer moves.
    pub throttle_interval_ms: u64,
    /// Name of the bearer credential in the credential store.
    pub credential_key: String,
    pub default_text_size: f64,
    pub eraser_tolerance: f64,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:3030/ws".to_string(),
            api_base_url: "http://localhost:3030".to_string(),
            throttle_interval_ms: 100,
            credential_key: "whiteboard_user_token".to_string(),
            default_text_size: DEFAULT_TEXT_SIZE,
            eraser_tolerance: DEFAULT_ERASER_TOLERANCE,
            reconnect_attempts: 5,
            reconnect_delay_ms: 1000,
        }
    }
}

impl SessionConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_toml(&std::fs::read_to_string(path)?)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `INKROOM_SERVER_URL` and `INKROOM_API_URL`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(SERVER_URL_ENV) {
            log::info!("Using relay url from {}", SERVER_URL_ENV);
            self.server_url = url;
        }
        if let Some(url) = lookup(API_URL_ENV) {
            log::info!("Using api url from {}", API_URL_ENV);
            self.api_base_url = url;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for url in [&self.server_url, &self.api_base_url] {
            url::Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.clone()))?;
        }
        Ok(())
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            attempts: self.reconnect_attempts,
            delay: Duration::from_millis(self.reconnect_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.throttle_interval(), Duration::from_millis(100));
        assert_eq!(config.credential_key, "whiteboard_user_token");
        assert_eq!(config.default_text_size, 32.0);
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = SessionConfig::from_toml("throttle_interval_ms = 250\n").unwrap();
        assert_eq!(config.throttle_interval_ms, 250);
        assert_eq!(config.reconnect_attempts, 5);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = SessionConfig::from_toml("server_url = \"not a url\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [(SERVER_URL_ENV, "wss://board.example/ws")].into();
        let mut config = SessionConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.server_url, "wss://board.example/ws");
        assert_eq!(config.api_base_url, "http://localhost:3030");
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inkroom.toml");
        std::fs::write(&path, "api_base_url = \"https://api.example\"\n").unwrap();
        let config = SessionConfig::load(&path).unwrap();
        assert!(
            config.api_base_url.starts_with("https://api.example")
                || std::env::var(API_URL_ENV).is_ok()
        );
    }
}
