//! Logging configuration

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use super::error::ValidationError;

/// Settings for the tracing subscriber
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directives, e.g. `info` or `tracked_repository=debug`
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    /// Build the filter, preferring `RUST_LOG` when it is set
    pub fn env_filter(&self) -> Result<EnvFilter, ValidationError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|_| ValidationError::InvalidLogFilter(self.level.clone())),
        }
    }

    /// Validate logging configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        EnvFilter::try_new(&self.level)
            .map(|_| ())
            .map_err(|_| ValidationError::InvalidLogFilter(self.level.clone()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
