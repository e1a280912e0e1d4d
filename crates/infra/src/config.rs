//! Process configuration, read from `CURATOR_*` environment variables.

use std::time::Duration;

use curator_inventory::{DEFAULT_BATCH_UNITS_LIMIT, MAX_BATCH_UNITS};
use thiserror::Error;

use crate::retry::RetryConfig;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://curator.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub batch_retry: RetryConfig,
    /// Units a single batch request may create.
    pub max_batch_units: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            batch_retry: RetryConfig::default(),
            max_batch_units: DEFAULT_BATCH_UNITS_LIMIT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys fall back to
    /// defaults; set keys must parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_attempts = parse_u64(&get, "CURATOR_BATCH_MAX_ATTEMPTS")?
            .map(|v| {
                u32::try_from(v).map_err(|_| ConfigError::Invalid {
                    key: "CURATOR_BATCH_MAX_ATTEMPTS",
                    message: format!("{v} is too large"),
                })
            })
            .transpose()?
            .unwrap_or(defaults.batch_retry.max_attempts);
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "CURATOR_BATCH_MAX_ATTEMPTS",
                message: "must be at least 1".to_string(),
            });
        }

        let initial_delay = parse_u64(&get, "CURATOR_BATCH_RETRY_INITIAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.batch_retry.initial_delay);
        let max_delay = parse_u64(&get, "CURATOR_BATCH_RETRY_MAX_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.batch_retry.max_delay);

        let max_connections = match parse_u64(&get, "CURATOR_DB_MAX_CONNECTIONS")? {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    key: "CURATOR_DB_MAX_CONNECTIONS",
                    message: "must be at least 1".to_string(),
                });
            }
            Some(v) => u32::try_from(v).map_err(|_| ConfigError::Invalid {
                key: "CURATOR_DB_MAX_CONNECTIONS",
                message: format!("{v} is too large"),
            })?,
            None => defaults.max_connections,
        };

        let max_batch_units = match parse_u64(&get, "CURATOR_BATCH_MAX_UNITS")? {
            Some(v) if (1..=MAX_BATCH_UNITS).contains(&v) => v,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    key: "CURATOR_BATCH_MAX_UNITS",
                    message: format!("{v} is outside 1..={MAX_BATCH_UNITS}"),
                });
            }
            None => defaults.max_batch_units,
        };

        Ok(Self {
            database_url: get("CURATOR_DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: get("CURATOR_BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_connections,
            batch_retry: RetryConfig {
                max_attempts,
                initial_delay,
                max_delay,
                ..defaults.batch_retry
            },
            max_batch_units,
        })
    }
}

fn parse_u64(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    get(key)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                key,
                message: format!("{raw:?}: {e}"),
            })
        })
        .transpose()
}
