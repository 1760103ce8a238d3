//! Shared plumbing for the database-backed repositories.
//!
//! [`DatabaseRepositoryBase`] holds the session, the key provider and the
//! error describer, and implements the write-reconciliation core:
//! [`DatabaseRepositoryBase::save_changes`] persists every pending change and
//! compares the affected-row count with the number of staged entities.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::foundation::{
    CompositeKey, CompositeKeyProvider, DefaultErrorDescriber, ErrorCause, ErrorDescriber,
    KeyProvider, KeyValue, KeyValues, RepositoryError, RepositoryFault, RepositoryResult,
    SingleKeyProvider, Tracking, UniqueEntity,
};
use crate::ports::{Session, SessionError};

/// Maps an affected-row count onto a result.
///
/// - `written == expected` is `Success` (including zero of zero)
/// - `written == 0` is `Failure(NothingWrittenToDatabase)`
/// - anything else is `Failure(UnexpectedDatabaseWriteCount)`
pub fn reconcile_write_count(
    expected: usize,
    written: usize,
    describer: &dyn ErrorDescriber,
) -> RepositoryResult {
    if written == expected {
        RepositoryResult::SUCCESS
    } else if written == 0 {
        RepositoryResult::failure(describer.nothing_written_to_database())
    } else {
        RepositoryResult::failure(describer.unexpected_database_write_count(expected, written))
    }
}

/// Races a session call against cancellation.
pub(crate) async fn guarded<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = Result<T, SessionError>> + Send,
) -> Result<T, SessionError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SessionError::Cancelled),
        outcome = operation => outcome,
    }
}

pub(crate) fn ensure_active(cancel: &CancellationToken) -> Result<(), RepositoryFault> {
    if cancel.is_cancelled() {
        return Err(RepositoryFault::Cancelled);
    }
    Ok(())
}

/// Maps a session error raised by a call without a result channel.
pub(crate) fn storage_fault(err: SessionError) -> RepositoryFault {
    match err {
        SessionError::Cancelled => RepositoryFault::Cancelled,
        other => RepositoryFault::Storage(other.to_string()),
    }
}

/// Session, key provider and describer shared by the repository implementations.
pub struct DatabaseRepositoryBase<E: UniqueEntity, S: ?Sized> {
    session: Arc<S>,
    key_provider: Arc<dyn KeyProvider<E::Key>>,
    describer: Arc<dyn ErrorDescriber>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: UniqueEntity, S: ?Sized> Clone for DatabaseRepositoryBase<E, S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            key_provider: Arc::clone(&self.key_provider),
            describer: Arc::clone(&self.describer),
            _entity: PhantomData,
        }
    }
}

impl<E, S> DatabaseRepositoryBase<E, S>
where
    E: UniqueEntity,
    S: Session<E> + ?Sized,
{
    /// Creates a base for entities keyed by a single value.
    pub fn new(session: Arc<S>) -> Self
    where
        E::Key: Into<KeyValue>,
    {
        Self::with_key_provider(session, Arc::new(SingleKeyProvider))
    }

    /// Creates a base for entities keyed by a tuple.
    pub fn with_composite_key(session: Arc<S>) -> Self
    where
        E::Key: CompositeKey,
    {
        Self::with_key_provider(session, Arc::new(CompositeKeyProvider))
    }

    pub fn with_key_provider(session: Arc<S>, key_provider: Arc<dyn KeyProvider<E::Key>>) -> Self {
        Self {
            session,
            key_provider,
            describer: Arc::new(DefaultErrorDescriber),
            _entity: PhantomData,
        }
    }

    /// Replaces the error describer.
    pub fn with_describer(mut self, describer: Arc<dyn ErrorDescriber>) -> Self {
        self.describer = describer;
        self
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    pub fn describer(&self) -> &dyn ErrorDescriber {
        self.describer.as_ref()
    }

    pub fn key_values(&self, id: &E::Key) -> KeyValues {
        self.key_provider.key_values(id)
    }

    pub fn not_found(&self, id: &E::Key) -> RepositoryError {
        self.describer
            .entity_with_key_not_found(E::entity_name(), &self.key_values(id))
    }

    /// Returns every entity with the requested tracking.
    pub async fn queryable(
        &self,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, SessionError> {
        guarded(cancel, self.session.query(tracking, cancel)).await
    }

    /// Looks an entity up by key.
    ///
    /// Tracked lookups go through the identity map; untracked ones through a
    /// filtered query.
    pub async fn lookup(
        &self,
        id: &E::Key,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, SessionError> {
        let key = self.key_values(id);
        match tracking {
            Tracking::Tracked => guarded(cancel, self.session.find(&key, cancel)).await,
            Tracking::Untracked => {
                guarded(cancel, self.session.query_by_key(&key, tracking, cancel)).await
            }
        }
    }

    pub async fn contains(&self, id: &E::Key, cancel: &CancellationToken) -> Result<bool, SessionError> {
        let key = self.key_values(id);
        guarded(cancel, self.session.any(&key, cancel)).await
    }

    pub fn stage_add(&self, entity: E) {
        self.session.stage_add(self.key_values(entity.id()), entity);
    }

    pub fn stage_update(&self, entity: E) {
        self.session.stage_update(self.key_values(entity.id()), entity);
    }

    pub fn stage_remove(&self, entity: E) {
        self.session.stage_remove(self.key_values(entity.id()), entity);
    }

    /// Maps a failed read onto a result.
    ///
    /// # Errors
    ///
    /// `Cancelled` when the read was cancelled.
    pub fn read_failure<T>(&self, err: SessionError) -> Result<RepositoryResult<T>, RepositoryFault> {
        match err {
            SessionError::Cancelled => Err(RepositoryFault::Cancelled),
            other => {
                tracing::warn!(entity = E::entity_name(), error = %other, "Database read failed");
                let cause: ErrorCause = Arc::new(other);
                Ok(RepositoryResult::failure(
                    self.describer.database_read_failure(cause),
                ))
            }
        }
    }

    /// Persists every pending change and reconciles the written count.
    ///
    /// # Errors
    ///
    /// `Cancelled` when the persist was cancelled. Every other session
    /// failure is reported through the result.
    pub async fn save_changes(
        &self,
        expected: usize,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        let entity = E::entity_name();

        match guarded(cancel, self.session.persist(cancel)).await {
            Ok(written) => {
                let result = reconcile_write_count(expected, written, self.describer());
                if result.is_successful() {
                    tracing::debug!(entity, expected, written, "Saved changes");
                } else {
                    tracing::warn!(entity, expected, written, "Unexpected database write count");
                }
                Ok(result)
            }
            Err(SessionError::Cancelled) => Err(RepositoryFault::Cancelled),
            Err(err) if err.is_concurrency() => {
                tracing::warn!(entity, error = %err, "Database concurrency conflict");
                let cause: ErrorCause = Arc::new(err);
                Ok(RepositoryResult::failure(
                    self.describer.database_concurrency_failure(cause),
                ))
            }
            Err(err) => {
                tracing::warn!(entity, error = %err, "Database update failed");
                let cause: ErrorCause = Arc::new(err);
                Ok(RepositoryResult::failure(
                    self.describer.database_update_failure(cause),
                ))
            }
        }
    }
}
