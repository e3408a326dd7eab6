//! Tunables for `TcpExchange`.

use std::env;

use serde::Deserialize;
use thiserror::Error;

/// Bytes requested per read when nothing else is configured.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 512;

pub const ENV_READ_BUFFER_SIZE: &str = "NETREQ_READ_BUFFER_SIZE";
pub const ENV_FALLBACK: &str = "NETREQ_FALLBACK";
pub const ENV_NODELAY: &str = "NETREQ_NODELAY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: expected {expected}, got {value:?}")]
    InvalidEnv {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-exchange settings. Every field has a default, so `{}` is valid JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExchangeConfig {
    /// Upper bound on bytes returned by a single read.
    pub read_buffer_size: usize,
    /// Try the remaining resolved addresses when the first connect fails.
    /// Off by default: only the first candidate is attempted.
    pub fallback_to_next_candidate: bool,
    /// Set `TCP_NODELAY` before connecting.
    pub nodelay: bool,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            fallback_to_next_candidate: false,
            nodelay: false,
        }
    }
}

impl ExchangeConfig {
    /// Defaults overridden by any `NETREQ_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Effective read size; a zero size would make every read look like EOF.
    pub fn read_chunk(&self) -> usize {
        self.read_buffer_size.max(1)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_READ_BUFFER_SIZE) {
            config.read_buffer_size =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv {
                        var: ENV_READ_BUFFER_SIZE,
                        expected: "a non-negative integer",
                        value: value.clone(),
                    })?;
        }
        if let Some(value) = lookup(ENV_FALLBACK) {
            config.fallback_to_next_candidate = parse_flag(ENV_FALLBACK, &value)?;
        }
        if let Some(value) = lookup(ENV_NODELAY) {
            config.nodelay = parse_flag(ENV_NODELAY, &value)?;
        }
        Ok(config)
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            expected: "a boolean flag",
            value: value.to_string(),
        }),
    }
}
