//! Session port - Interface to the change-tracking persistence session.
//!
//! The session is the unit of work: it tracks entities by primary key,
//! stages additions, updates and removals, and persists every pending
//! change in one call that reports the number of affected rows.
//!
//! ## Entry states
//!
//! ```text
//! stage_add     -> Added     --persist--> Unchanged
//! stage_update  -> Modified  --persist--> Unchanged   (Added stays Added)
//! stage_remove  -> Deleted   --persist--> detached    (Added is detached at once)
//! ```
//!
//! Registered [`SaveInterceptor`](super::SaveInterceptor)s run synchronously
//! right before a persist writes anything.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::foundation::{KeyValues, Tracking, UniqueEntity};

/// Change classification of a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Not tracked by the session.
    Detached,

    /// Tracked with no pending change.
    Unchanged,

    /// Will be inserted on the next persist.
    Added,

    /// Will be updated on the next persist.
    Modified,

    /// Will be removed on the next persist.
    Deleted,
}

impl EntryState {
    /// Check if the entry will be written on the next persist.
    pub fn is_pending(&self) -> bool {
        matches!(self, EntryState::Added | EntryState::Modified | EntryState::Deleted)
    }
}

/// Errors raised by a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("The session operation was cancelled")]
    Cancelled,

    /// Update conflict caused by a concurrent change (row missing or version changed).
    #[error("Concurrency conflict: {0}")]
    Concurrency(String),

    /// Any other update conflict (constraint violation, duplicate key).
    #[error("Update failed: {0}")]
    Update(String),

    #[error("Query failed: {0}")]
    Query(String),
}

impl SessionError {
    /// Check if the error is an update conflict raised while persisting.
    pub fn is_update_conflict(&self) -> bool {
        matches!(self, SessionError::Concurrency(_) | SessionError::Update(_))
    }

    /// Check if the error is the concurrency subtype of an update conflict.
    pub fn is_concurrency(&self) -> bool {
        matches!(self, SessionError::Concurrency(_))
    }
}

/// Port for a change-tracking persistence session over one entity type.
///
/// The caller computes key values with its key provider and passes them
/// alongside entities, so the session only ever indexes by [`KeyValues`].
///
/// A session serves one coordinated sequence of calls at a time; sharing one
/// instance between concurrent units of work is not supported.
#[async_trait]
pub trait Session<E: UniqueEntity>: Send + Sync {
    /// Identity-map aware lookup. The returned entity is tracked.
    async fn find(
        &self,
        key: &KeyValues,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, SessionError>;

    /// Filtered lookup through a query.
    async fn query_by_key(
        &self,
        key: &KeyValues,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, SessionError>;

    /// All entities, ordered by key.
    async fn query(
        &self,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, SessionError>;

    /// Check if a persisted entity has the key.
    async fn any(&self, key: &KeyValues, cancel: &CancellationToken) -> Result<bool, SessionError>;

    fn stage_add(&self, key: KeyValues, entity: E);

    fn stage_update(&self, key: KeyValues, entity: E);

    fn stage_remove(&self, key: KeyValues, entity: E);

    /// Persists every pending change and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// - `Concurrency` when a modified or deleted row no longer exists
    /// - `Update` for other write conflicts
    /// - `Cancelled` when `cancel` fired before the write
    async fn persist(&self, cancel: &CancellationToken) -> Result<usize, SessionError>;
}
