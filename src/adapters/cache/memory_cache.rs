//! In-process cache with size accounting, priority eviction and expiration.
//!
//! Each entry carries a caller-defined size. When a size limit is set and an
//! insertion would exceed it, entries are evicted lowest priority first,
//! oldest first within a priority. `NeverRemove` entries are never evicted
//! to make room; if room cannot be made the new entry is not stored.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::config::CacheConfig;
use crate::ports::{Cache, CacheEntryOptions, CachePriority};

struct Slot<V> {
    value: V,
    size: u64,
    priority: CachePriority,
    sequence: u64,
    expires_at: Option<Instant>,
}

impl<V> Slot<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

struct State<V> {
    slots: HashMap<String, Slot<V>>,
    total_size: u64,
    next_sequence: u64,
}

impl<V> State<V> {
    fn remove(&mut self, key: &str) -> Option<Slot<V>> {
        let slot = self.slots.remove(key)?;
        self.total_size -= slot.size;
        Some(slot)
    }

    fn purge_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.remove(&key);
        }
    }

    fn eviction_candidate(&self) -> Option<String> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.priority != CachePriority::NeverRemove)
            .min_by_key(|(_, slot)| (slot.priority, slot.sequence))
            .map(|(key, _)| key.clone())
    }
}

/// Thread-safe in-memory [`Cache`].
pub struct MemoryCache<V> {
    state: Mutex<State<V>>,
    size_limit: Option<u64>,
}

impl<V> MemoryCache<V> {
    /// Creates an unbounded cache.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                slots: HashMap::new(),
                total_size: 0,
                next_sequence: 0,
            }),
            size_limit: None,
        }
    }

    /// Creates a cache whose entry sizes may not sum above `size_limit`.
    pub fn with_size_limit(size_limit: u64) -> Self {
        Self {
            size_limit: Some(size_limit),
            ..Self::new()
        }
    }

    /// Creates a cache bounded by the configured size limit, if any.
    pub fn from_config(config: &CacheConfig) -> Self {
        match config.size_limit {
            Some(limit) => Self::with_size_limit(limit),
            None => Self::new(),
        }
    }

    pub fn size_limit(&self) -> Option<u64> {
        self.size_limit
    }

    /// Returns the number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().slots.is_empty()
    }

    /// Returns the summed size of stored entries.
    pub fn total_size(&self) -> u64 {
        self.lock().total_size
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .slots
            .get(key)
            .is_some_and(|slot| !slot.is_expired(now))
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.slots.clear();
        state.total_size = 0;
    }

    fn lock(&self) -> MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes room for `size` more units. Returns false when that is impossible.
    fn make_room(&self, state: &mut State<V>, size: u64) -> bool {
        let Some(limit) = self.size_limit else {
            return true;
        };
        if size > limit {
            return false;
        }

        while state.total_size + size > limit {
            match state.eviction_candidate() {
                Some(victim) => {
                    tracing::trace!(key = %victim, "Evicting cache entry");
                    state.remove(&victim);
                }
                None => return false,
            }
        }
        true
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Cache<V> for MemoryCache<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut state = self.lock();

        if state.slots.get(key)?.is_expired(now) {
            state.remove(key);
            return None;
        }
        state.slots.get(key).map(|slot| slot.value.clone())
    }

    fn set(&self, key: String, value: V, options: CacheEntryOptions) {
        let now = Instant::now();
        let mut state = self.lock();

        state.purge_expired(now);
        state.remove(&key);

        if !self.make_room(&mut state, options.size) {
            tracing::debug!(key = %key, size = options.size, "Cache entry does not fit, skipping");
            return;
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.total_size += options.size;
        state.slots.insert(
            key,
            Slot {
                value,
                size: options.size,
                priority: options.priority,
                sequence,
                expires_at: options.expiration.map(|ttl| now + ttl),
            },
        );
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn sized(size: u64) -> CacheEntryOptions {
        CacheEntryOptions::new(size)
    }

    #[test]
    fn stores_and_returns_values() {
        let cache = MemoryCache::new();
        cache.set("a".to_string(), 1, sized(1));

        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn replacing_a_key_updates_total_size() {
        let cache = MemoryCache::new();
        cache.set("a".to_string(), 1, sized(3));
        cache.set("a".to_string(), 2, sized(5));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_size(), 5);
        assert_eq!(cache.get("a"), Some(2));
    }

    #[test]
    fn remove_drops_entry() {
        let cache = MemoryCache::new();
        cache.set("a".to_string(), 1, sized(1));
        cache.remove("a");

        assert!(cache.is_empty());
        assert_eq!(cache.total_size(), 0);
    }

    #[test]
    fn evicts_lowest_priority_first() {
        let cache = MemoryCache::with_size_limit(2);
        cache.set("high".to_string(), 1, sized(1).with_priority(CachePriority::High));
        cache.set("low".to_string(), 2, sized(1).with_priority(CachePriority::Low));
        cache.set("new".to_string(), 3, sized(1));

        assert!(cache.contains_key("high"));
        assert!(!cache.contains_key("low"));
        assert!(cache.contains_key("new"));
    }

    #[test]
    fn evicts_oldest_within_a_priority() {
        let cache = MemoryCache::with_size_limit(2);
        cache.set("first".to_string(), 1, sized(1));
        cache.set("second".to_string(), 2, sized(1));
        cache.set("third".to_string(), 3, sized(1));

        assert!(!cache.contains_key("first"));
        assert!(cache.contains_key("second"));
        assert!(cache.contains_key("third"));
    }

    #[test]
    fn never_remove_entries_survive_pressure() {
        let cache = MemoryCache::with_size_limit(1);
        cache.set(
            "pinned".to_string(),
            1,
            sized(1).with_priority(CachePriority::NeverRemove),
        );
        cache.set("other".to_string(), 2, sized(1));

        assert!(cache.contains_key("pinned"));
        assert!(!cache.contains_key("other"));
    }

    #[test]
    fn oversized_entries_are_not_stored() {
        let cache = MemoryCache::with_size_limit(4);
        cache.set("small".to_string(), 1, sized(2));
        cache.set("huge".to_string(), 2, sized(5));

        assert!(cache.contains_key("small"));
        assert!(!cache.contains_key("huge"));
    }

    #[test]
    fn zero_sized_entries_always_fit() {
        let cache = MemoryCache::with_size_limit(1);
        cache.set("full".to_string(), 1, sized(1).with_priority(CachePriority::High));
        cache.set("free".to_string(), 2, sized(0).with_priority(CachePriority::Low));

        assert!(cache.contains_key("full"));
        assert!(cache.contains_key("free"));
    }

    #[test]
    fn from_config_applies_size_limit() {
        let config = CacheConfig {
            size_limit: Some(64),
            ..Default::default()
        };
        let cache: MemoryCache<u8> = MemoryCache::from_config(&config);

        assert_eq!(cache.size_limit(), Some(64));
        assert_eq!(MemoryCache::<u8>::from_config(&CacheConfig::default()).size_limit(), None);
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = MemoryCache::new();
        cache.set(
            "gone".to_string(),
            1,
            sized(1).with_expiration(Some(Duration::ZERO)),
        );
        cache.set(
            "kept".to_string(),
            2,
            sized(1).with_expiration(Some(Duration::from_secs(3600))),
        );

        assert_eq!(cache.get("gone"), None);
        assert_eq!(cache.get("kept"), Some(2));
    }
}
