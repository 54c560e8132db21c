//! Tracing subscriber setup shared by the workspace binaries.
//!
//! Log output is either human readable (`text`) or one JSON object per line
//! (`json`). `RUST_LOG` always wins over the configured default filter.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, single line per event
    #[default]
    Text,
    /// Structured JSON, one object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = ObservabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ObservabilityError::InvalidLogFormat(other.to_string())),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Filter directives used when `RUST_LOG` is not set
    pub default_filter: String,
    /// Output format
    pub log_format: LogFormat,
}

impl ObservabilityConfig {
    /// Create a text-format configuration with the given default filter.
    #[must_use]
    pub fn new(default_filter: impl Into<String>) -> Self {
        Self {
            default_filter: default_filter.into(),
            log_format: LogFormat::Text,
        }
    }

    /// Set the log format.
    #[must_use]
    pub fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }
}

/// Errors raised while configuring observability.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Unsupported log format: {0} (expected 'text' or 'json')")]
    InvalidLogFormat(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns `ObservabilityError::Init` if a global subscriber is already set.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter.as_str()));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };

    result.map_err(|e| ObservabilityError::Init(e.to_string()))
}
