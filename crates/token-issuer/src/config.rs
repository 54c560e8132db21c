use crate::services::key_publisher::DEFAULT_KMS_TIMEOUT;
use crate::services::tokenizer::DEFAULT_TOKEN_TTL;
use crate::tasks::key_rotation::{KeyRotationConfig, DEFAULT_FAILURE_THRESHOLD};
use common::observability::{LogFormat, ObservabilityConfig};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Shortest rotation interval the service will run with (5 minutes).
///
/// Every rotation registers a key with the KMS; this bounds that load no
/// matter what is configured.
pub const MIN_ROTATION_INTERVAL: Duration = Duration::from_secs(5 * 60);

const DEFAULT_KMS_URL: &str = "http://localhost:5001/graphql";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3002";
const DEFAULT_KEY_ROLLING_HOURS: u64 = 1;
const DEFAULT_LOG_FILTER: &str = "token_issuer=debug,tower_http=debug";

#[derive(Debug, Clone)]
pub struct Config {
    /// KMS GraphQL endpoint used to register public keys.
    pub kms_url: String,
    pub kms_timeout: Duration,
    /// Rotation interval as configured, before the minimum is applied.
    pub requested_rotation_interval: Duration,
    pub rotation_failure_threshold: u32,
    /// Token lifetime when callers pass no TTL.
    pub token_ttl: Duration,
    pub bind_address: String,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let kms_url = vars
            .get("INTERNAL_GRAPHQL_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_KMS_URL.to_string());

        if !kms_url.starts_with("http://") && !kms_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                name: "INTERNAL_GRAPHQL_URL".to_string(),
                reason: "must be an http(s) URL".to_string(),
            });
        }

        let kms_timeout = parse_var::<u64>(vars, "KMS_TIMEOUT_SECONDS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_KMS_TIMEOUT);
        if kms_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "KMS_TIMEOUT_SECONDS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        // Seconds take precedence over hours so tests and staging can run
        // short intervals; the minimum below still applies.
        let requested_rotation_interval =
            match parse_var::<u64>(vars, "KEY_ROLLING_DURATION_SECONDS")? {
                Some(seconds) => Duration::from_secs(seconds),
                None => {
                    let hours = parse_var::<u64>(vars, "KEY_ROLLING_DURATION_IN_HOURS")?
                        .unwrap_or(DEFAULT_KEY_ROLLING_HOURS);
                    Duration::from_secs(hours.saturating_mul(3600))
                }
            };

        let rotation_failure_threshold = parse_var::<u32>(vars, "ROTATION_FAILURE_THRESHOLD")?
            .unwrap_or(DEFAULT_FAILURE_THRESHOLD);
        if rotation_failure_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                name: "ROTATION_FAILURE_THRESHOLD".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let token_ttl = parse_var::<u64>(vars, "JWT_VALIDITY_SECONDS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        if token_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "JWT_VALIDITY_SECONDS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let log_format = match vars.get("LOG_FORMAT") {
            Some(value) => LogFormat::from_str(value).map_err(|e| ConfigError::InvalidValue {
                name: "LOG_FORMAT".to_string(),
                reason: e.to_string(),
            })?,
            None => LogFormat::default(),
        };

        Ok(Config {
            kms_url,
            kms_timeout,
            requested_rotation_interval,
            rotation_failure_threshold,
            token_ttl,
            bind_address,
            observability: ObservabilityConfig::new(DEFAULT_LOG_FILTER).with_log_format(log_format),
        })
    }

    /// Rotation interval with `MIN_ROTATION_INTERVAL` applied.
    pub fn rotation_interval(&self) -> Duration {
        self.requested_rotation_interval.max(MIN_ROTATION_INTERVAL)
    }

    /// Settings for the background rotation task.
    pub fn key_rotation(&self) -> KeyRotationConfig {
        KeyRotationConfig {
            interval: self.rotation_interval(),
            failure_threshold: self.rotation_failure_threshold,
        }
    }
}

fn parse_var<T: FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    vars.get(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
        })
        .transpose()
}
