//! Server configuration from the environment.

use std::collections::HashMap;
use std::net::SocketAddr;
use thiserror::Error;

pub const ADDR_ENV: &str = "INKROOM_ADDR";
pub const TOKENS_ENV: &str = "INKROOM_TOKENS";

const DEFAULT_ADDR: &str = "0.0.0.0:3030";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid bind address `{0}`")]
    InvalidAddr(String),
    #[error("invalid token entry `{0}`, expected token=email")]
    InvalidToken(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Bearer token -> user email.
    pub tokens: HashMap<String, String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = lookup(ADDR_ENV).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(addr.clone()))?;
        let tokens = match lookup(TOKENS_ENV) {
            Some(table) => parse_tokens(&table)?,
            None => HashMap::new(),
        };
        Ok(Self { addr, tokens })
    }
}

/// Parse `token=email,token=email`.
pub fn parse_tokens(table: &str) -> Result<HashMap<String, String>, ConfigError> {
    table
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((token, email)) if !token.trim().is_empty() && !email.trim().is_empty() => {
                Ok((token.trim().to_string(), email.trim().to_string()))
            }
            _ => Err(ConfigError::InvalidToken(entry.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.addr.port(), 3030);
        assert!(config.tokens.is_empty());
    }

    #[test]
    fn test_token_table() {
        let tokens = parse_tokens("abc=a@x.io, def = b@x.io,").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens["def"], "b@x.io");
        assert_eq!(
            parse_tokens("abc"),
            Err(ConfigError::InvalidToken("abc".to_string()))
        );
    }

    #[test]
    fn test_bad_addr() {
        let result = ServerConfig::from_lookup(|key| (key == ADDR_ENV).then(|| "nope".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidAddr(_))));
    }
}
