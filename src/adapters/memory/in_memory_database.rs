//! In-memory row store shared by sessions.
//!
//! Several [`InMemorySession`](super::InMemorySession)s can point at one
//! database to model independent units of work over the same data.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::foundation::KeyValues;

/// Committed rows keyed by their key values.
///
/// Cloning shares the underlying storage.
pub struct InMemoryDatabase<E> {
    rows: Arc<RwLock<BTreeMap<KeyValues, E>>>,
}

impl<E> Clone for InMemoryDatabase<E> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<E> Default for InMemoryDatabase<E> {
    fn default() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl<E: Clone> InMemoryDatabase<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a database pre-populated with rows.
    pub fn with_rows(rows: impl IntoIterator<Item = (KeyValues, E)>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows.into_iter().collect())),
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, key: &KeyValues) -> bool {
        self.read().contains_key(key)
    }

    /// Returns a copy of the committed row.
    pub fn get(&self, key: &KeyValues) -> Option<E> {
        self.read().get(key).cloned()
    }

    /// Returns copies of all committed rows in key order.
    pub fn rows(&self) -> Vec<E> {
        self.read().values().cloned().collect()
    }

    /// Writes a row directly, bypassing any session.
    pub fn insert(&self, key: KeyValues, entity: E) {
        self.write().insert(key, entity);
    }

    /// Removes a row directly, bypassing any session.
    pub fn remove(&self, key: &KeyValues) -> Option<E> {
        self.write().remove(key)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, BTreeMap<KeyValues, E>> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<KeyValues, E>> {
        self.rows.write().unwrap_or_else(PoisonError::into_inner)
    }
}
