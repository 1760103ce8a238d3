//! Repository configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `TRACKED_REPOSITORY` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use tracked_repository::config::RepositoryConfig;
//!
//! let config = RepositoryConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Cache size limit: {:?}", config.cache.size_limit);
//! ```

mod cache;
mod error;
mod logging;

pub use cache::CacheConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;

use serde::Deserialize;

/// Root configuration
///
/// Every section has defaults, so an empty environment yields a valid configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Read cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Tracing subscriber configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RepositoryConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `TRACKED_REPOSITORY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `TRACKED_REPOSITORY__CACHE__SIZE_LIMIT=1000` -> `cache.size_limit = 1000`
    /// - `TRACKED_REPOSITORY__LOGGING__JSON=true` -> `logging.json = true`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TRACKED_REPOSITORY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load and validate in one step
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` for semantically invalid values
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.cache.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
