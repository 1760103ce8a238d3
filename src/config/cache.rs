//! Cache configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Settings for the repository read cache
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum summed entry size; unbounded when absent
    #[serde(default)]
    pub size_limit: Option<u64>,

    /// Expiration of cached reads in seconds; never expires when absent
    #[serde(default)]
    pub expiration_secs: Option<u64>,

    /// Whether not-found reads are cached; read failures never are
    #[serde(default = "default_cache_failures")]
    pub cache_failures: bool,
}

impl CacheConfig {
    /// Get expiration as Duration
    pub fn expiration(&self) -> Option<Duration> {
        self.expiration_secs.map(Duration::from_secs)
    }

    /// Validate cache configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.size_limit == Some(0) {
            return Err(ValidationError::InvalidCacheSizeLimit);
        }
        if self.expiration_secs == Some(0) {
            return Err(ValidationError::InvalidCacheExpiration);
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size_limit: None,
            expiration_secs: None,
            cache_failures: default_cache_failures(),
        }
    }
}

fn default_cache_failures() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.size_limit, None);
        assert_eq!(config.expiration(), None);
        assert!(config.cache_failures);
    }

    #[test]
    fn test_expiration_duration() {
        let config = CacheConfig {
            expiration_secs: Some(90),
            ..Default::default()
        };
        assert_eq!(config.expiration(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_validation_zero_size_limit() {
        let config = CacheConfig {
            size_limit: Some(0),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidCacheSizeLimit));
    }

    #[test]
    fn test_validation_zero_expiration() {
        let config = CacheConfig {
            expiration_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidCacheExpiration));
    }

    #[test]
    fn test_validation_bounded_cache() {
        let config = CacheConfig {
            size_limit: Some(1024),
            expiration_secs: Some(60),
            cache_failures: false,
        };
        assert!(config.validate().is_ok());
    }
}
