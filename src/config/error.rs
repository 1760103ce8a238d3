//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Cache size limit must be greater than zero")]
    InvalidCacheSizeLimit,

    #[error("Cache expiration must be greater than zero seconds")]
    InvalidCacheExpiration,

    #[error("Invalid log filter '{0}'")]
    InvalidLogFilter(String),
}
