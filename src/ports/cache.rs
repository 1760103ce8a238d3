//! Cache port - In-process key/value cache with size and priority hints.

use std::time::Duration;

/// Eviction priority hint. Lower priorities are evicted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CachePriority {
    Low,
    #[default]
    Normal,
    High,
    /// Never evicted to make room; still removed on expiration.
    NeverRemove,
}

/// Hints attached to a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheEntryOptions {
    /// Caller-defined weight counted against the cache size limit.
    pub size: u64,

    pub priority: CachePriority,

    /// Absolute expiration relative to insertion. `None` never expires.
    pub expiration: Option<Duration>,
}

impl CacheEntryOptions {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: CachePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_expiration(mut self, expiration: Option<Duration>) -> Self {
        self.expiration = expiration;
        self
    }
}

/// Port for an in-process cache.
///
/// Implementations may drop entries at any time; callers treat a miss as
/// "ask the source".
pub trait Cache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;

    fn set(&self, key: String, value: V, options: CacheEntryOptions);

    fn remove(&self, key: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_order_by_eviction_preference() {
        assert!(CachePriority::Low < CachePriority::Normal);
        assert!(CachePriority::High < CachePriority::NeverRemove);
    }

    #[test]
    fn entry_options_builder_sets_fields() {
        let options = CacheEntryOptions::new(12)
            .with_priority(CachePriority::Low)
            .with_expiration(Some(Duration::from_secs(5)));

        assert_eq!(options.size, 12);
        assert_eq!(options.priority, CachePriority::Low);
        assert_eq!(options.expiration, Some(Duration::from_secs(5)));
    }

    #[test]
    fn default_priority_is_normal() {
        assert_eq!(CacheEntryOptions::default().priority, CachePriority::Normal);
    }
}
