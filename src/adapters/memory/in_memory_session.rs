//! In-memory change-tracking session for testing.
//!
//! Implements the [`Session`] port over an [`InMemoryDatabase`]. Entities are
//! tracked by key values in an identity map; staged changes are written to
//! the database only when [`Session::persist`] runs.
//!
//! # Conflict detection
//!
//! A persist is validated as a whole before anything is written:
//!
//! - adding a key that already exists, or violating a unique index, is an
//!   update failure
//! - modifying or removing a row that no longer exists is a concurrency
//!   conflict
//!
//! A rejected persist leaves both the database and the tracker untouched,
//! so the rejected entries stay pending until [`InMemorySession::clear_tracking`]
//! is called.
//!
//! # Example
//!
//! ```ignore
//! let database = InMemoryDatabase::new();
//! let session = InMemorySession::new(database.clone())
//!     .with_interceptor(TimestampInterceptor::new(Arc::new(SystemClock)))
//!     .with_unique_index("email", |user: &User| user.email.clone());
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::InMemoryDatabase;
use crate::domain::foundation::{KeyValues, Tracking, UniqueEntity};
use crate::ports::{EntityEntry, EntryState, SaveInterceptor, Session, SessionError};

struct TrackedEntry<E> {
    entity: E,
    state: EntryState,
}

impl<E> TrackedEntry<E> {
    fn new(entity: E, state: EntryState) -> Self {
        Self { entity, state }
    }
}

type Projection<E> = Box<dyn Fn(&E) -> String + Send + Sync>;

struct UniqueIndex<E> {
    name: String,
    project: Projection<E>,
}

/// Change-tracking session over an [`InMemoryDatabase`].
pub struct InMemorySession<E: UniqueEntity> {
    database: InMemoryDatabase<E>,
    tracker: Mutex<BTreeMap<KeyValues, TrackedEntry<E>>>,
    interceptors: Vec<Arc<dyn SaveInterceptor<E>>>,
    unique_indexes: Vec<UniqueIndex<E>>,
}

impl<E: UniqueEntity> InMemorySession<E> {
    pub fn new(database: InMemoryDatabase<E>) -> Self {
        Self {
            database,
            tracker: Mutex::new(BTreeMap::new()),
            interceptors: Vec::new(),
            unique_indexes: Vec::new(),
        }
    }

    /// Registers an interceptor that runs before every persist.
    pub fn with_interceptor(mut self, interceptor: impl SaveInterceptor<E> + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Registers a shared interceptor that runs before every persist.
    pub fn with_shared_interceptor(mut self, interceptor: Arc<dyn SaveInterceptor<E>>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Declares a unique index: no two persisted rows may project to the same value.
    pub fn with_unique_index(
        mut self,
        name: impl Into<String>,
        project: impl Fn(&E) -> String + Send + Sync + 'static,
    ) -> Self {
        self.unique_indexes.push(UniqueIndex {
            name: name.into(),
            project: Box::new(project),
        });
        self
    }

    pub fn database(&self) -> &InMemoryDatabase<E> {
        &self.database
    }

    /// Returns the tracking state of the entry with the given key.
    pub fn entry_state(&self, key: &KeyValues) -> EntryState {
        self.lock_tracker()
            .get(key)
            .map(|entry| entry.state)
            .unwrap_or(EntryState::Detached)
    }

    /// Returns the number of tracked entries, pending or not.
    pub fn tracked_count(&self) -> usize {
        self.lock_tracker().len()
    }

    /// Detaches every tracked entry, discarding pending changes.
    pub fn clear_tracking(&self) {
        self.lock_tracker().clear();
    }

    fn lock_tracker(&self) -> MutexGuard<'_, BTreeMap<KeyValues, TrackedEntry<E>>> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_active(cancel: &CancellationToken) -> Result<(), SessionError> {
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        Ok(())
    }

    /// Returns the tracked instance for a loaded row, attaching the row if needed.
    fn attach(
        tracker: &mut BTreeMap<KeyValues, TrackedEntry<E>>,
        key: &KeyValues,
        row: E,
    ) -> E {
        tracker
            .entry(key.clone())
            .or_insert_with(|| TrackedEntry::new(row, EntryState::Unchanged))
            .entity
            .clone()
    }

    fn run_interceptors(&self, tracker: &mut BTreeMap<KeyValues, TrackedEntry<E>>) {
        if self.interceptors.is_empty() {
            return;
        }

        let mut entries: Vec<EntityEntry<'_, E>> = tracker
            .values_mut()
            .map(|tracked| EntityEntry::new(tracked.state, &mut tracked.entity))
            .collect();

        for interceptor in &self.interceptors {
            interceptor.saving_changes(&mut entries);
        }
    }

    fn check_rows(
        rows: &BTreeMap<KeyValues, E>,
        pending: &[(&KeyValues, &TrackedEntry<E>)],
    ) -> Result<(), SessionError> {
        for (key, tracked) in pending {
            let exists = rows.contains_key(*key);
            match tracked.state {
                EntryState::Added if exists => {
                    return Err(SessionError::Update(format!(
                        "duplicate key '{}' for {}",
                        key,
                        E::entity_name()
                    )));
                }
                EntryState::Modified | EntryState::Deleted if !exists => {
                    return Err(SessionError::Concurrency(format!(
                        "{} with key '{}' no longer exists",
                        E::entity_name(),
                        key
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_unique_indexes(
        &self,
        rows: &BTreeMap<KeyValues, E>,
        pending: &[(&KeyValues, &TrackedEntry<E>)],
    ) -> Result<(), SessionError> {
        if self.unique_indexes.is_empty() {
            return Ok(());
        }

        let mut projected: BTreeMap<&KeyValues, &E> = rows.iter().collect();
        for (key, tracked) in pending {
            match tracked.state {
                EntryState::Deleted => {
                    projected.remove(*key);
                }
                _ => {
                    projected.insert(*key, &tracked.entity);
                }
            }
        }

        for index in &self.unique_indexes {
            let mut seen = HashSet::with_capacity(projected.len());
            for entity in projected.values() {
                let value = (index.project)(entity);
                if !seen.insert(value.clone()) {
                    return Err(SessionError::Update(format!(
                        "unique index '{}' violated by value '{}'",
                        index.name, value
                    )));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<E: UniqueEntity> Session<E> for InMemorySession<E> {
    async fn find(
        &self,
        key: &KeyValues,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, SessionError> {
        Self::ensure_active(cancel)?;

        let mut tracker = self.lock_tracker();
        if let Some(tracked) = tracker.get(key) {
            if tracked.state == EntryState::Deleted {
                return Ok(None);
            }
            return Ok(Some(tracked.entity.clone()));
        }

        Ok(self
            .database
            .get(key)
            .map(|row| Self::attach(&mut tracker, key, row)))
    }

    async fn query_by_key(
        &self,
        key: &KeyValues,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, SessionError> {
        Self::ensure_active(cancel)?;

        let row = self.database.get(key);
        match tracking {
            Tracking::Untracked => Ok(row),
            Tracking::Tracked => {
                let mut tracker = self.lock_tracker();
                Ok(row.map(|row| Self::attach(&mut tracker, key, row)))
            }
        }
    }

    async fn query(
        &self,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, SessionError> {
        Self::ensure_active(cancel)?;

        let rows: Vec<(KeyValues, E)> = self
            .database
            .read()
            .iter()
            .map(|(key, row)| (key.clone(), row.clone()))
            .collect();

        match tracking {
            Tracking::Untracked => Ok(rows.into_iter().map(|(_, row)| row).collect()),
            Tracking::Tracked => {
                let mut tracker = self.lock_tracker();
                Ok(rows
                    .into_iter()
                    .map(|(key, row)| Self::attach(&mut tracker, &key, row))
                    .collect())
            }
        }
    }

    async fn any(&self, key: &KeyValues, cancel: &CancellationToken) -> Result<bool, SessionError> {
        Self::ensure_active(cancel)?;
        Ok(self.database.contains(key))
    }

    fn stage_add(&self, key: KeyValues, entity: E) {
        self.lock_tracker()
            .insert(key, TrackedEntry::new(entity, EntryState::Added));
    }

    fn stage_update(&self, key: KeyValues, entity: E) {
        let mut tracker = self.lock_tracker();
        let state = match tracker.get(&key).map(|tracked| tracked.state) {
            Some(EntryState::Added) => EntryState::Added,
            _ => EntryState::Modified,
        };
        tracker.insert(key, TrackedEntry::new(entity, state));
    }

    fn stage_remove(&self, key: KeyValues, entity: E) {
        let mut tracker = self.lock_tracker();
        match tracker.get(&key).map(|tracked| tracked.state) {
            Some(EntryState::Added) => {
                tracker.remove(&key);
            }
            _ => {
                tracker.insert(key, TrackedEntry::new(entity, EntryState::Deleted));
            }
        }
    }

    async fn persist(&self, cancel: &CancellationToken) -> Result<usize, SessionError> {
        Self::ensure_active(cancel)?;

        let mut tracker = self.lock_tracker();
        self.run_interceptors(&mut tracker);

        let written = {
            let pending: Vec<(&KeyValues, &TrackedEntry<E>)> = tracker
                .iter()
                .filter(|(_, tracked)| tracked.state.is_pending())
                .collect();

            if pending.is_empty() {
                return Ok(0);
            }

            let mut rows = self.database.write();
            Self::check_rows(&rows, &pending)?;
            self.check_unique_indexes(&rows, &pending)?;

            for (key, tracked) in &pending {
                match tracked.state {
                    EntryState::Deleted => {
                        rows.remove(*key);
                    }
                    _ => {
                        rows.insert((*key).clone(), tracked.entity.clone());
                    }
                }
            }
            pending.len()
        };

        tracker.retain(|_, tracked| tracked.state != EntryState::Deleted);
        for tracked in tracker.values_mut() {
            tracked.state = EntryState::Unchanged;
        }

        tracing::trace!(entity = E::entity_name(), written, "Persisted in-memory changes");
        Ok(written)
    }
}
