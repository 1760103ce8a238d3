//! Read-write repository over a change-tracking session.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::base::{ensure_active, storage_fault, DatabaseRepositoryBase};
use super::ReadOnlyDatabaseRepository;
use crate::domain::foundation::{
    CompositeKey, ErrorDescriber, KeyProvider, KeyValue, ReadOnlyRepository, Repository,
    RepositoryFault, RepositoryResult, Tracking, UniqueEntity,
};
use crate::ports::Session;

/// [`Repository`] implementation writing through a [`Session`].
///
/// Every mutating call stages its entities and persists the session once,
/// expecting one written row per staged entity. Changes staged on the same
/// session by other callers are persisted as well and count towards the
/// written rows.
pub struct DatabaseRepository<E: UniqueEntity, S: ?Sized> {
    reads: ReadOnlyDatabaseRepository<E, S>,
}

impl<E: UniqueEntity, S: ?Sized> Clone for DatabaseRepository<E, S> {
    fn clone(&self) -> Self {
        Self {
            reads: self.reads.clone(),
        }
    }
}

impl<E, S> DatabaseRepository<E, S>
where
    E: UniqueEntity,
    S: Session<E> + ?Sized,
{
    pub fn new(session: Arc<S>) -> Self
    where
        E::Key: Into<KeyValue>,
    {
        Self::from_base(DatabaseRepositoryBase::new(session))
    }

    /// Creates a repository for entities keyed by a tuple.
    pub fn with_composite_key(session: Arc<S>) -> Self
    where
        E::Key: CompositeKey,
    {
        Self::from_base(DatabaseRepositoryBase::with_composite_key(session))
    }

    pub fn with_key_provider(session: Arc<S>, key_provider: Arc<dyn KeyProvider<E::Key>>) -> Self {
        Self::from_base(DatabaseRepositoryBase::with_key_provider(session, key_provider))
    }

    pub fn from_base(base: DatabaseRepositoryBase<E, S>) -> Self {
        Self {
            reads: ReadOnlyDatabaseRepository::from_base(base),
        }
    }

    pub fn with_describer(self, describer: Arc<dyn ErrorDescriber>) -> Self {
        Self {
            reads: self.reads.with_describer(describer),
        }
    }

    pub fn base(&self) -> &DatabaseRepositoryBase<E, S> {
        self.reads.base()
    }

    async fn stage_and_save(
        &self,
        entities: Vec<E>,
        stage: fn(&DatabaseRepositoryBase<E, S>, E),
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        ensure_active(cancel)?;

        let expected = entities.len();
        for entity in entities {
            stage(self.base(), entity);
        }
        self.base().save_changes(expected, cancel).await
    }
}

#[async_trait]
impl<E, S> ReadOnlyRepository<E> for DatabaseRepository<E, S>
where
    E: UniqueEntity,
    S: Session<E> + ?Sized,
{
    async fn get_by_id(
        &self,
        id: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult<E>, RepositoryFault> {
        self.reads.get_by_id(id, cancel).await
    }

    async fn get_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult<Vec<E>>, RepositoryFault> {
        self.reads.get_all(cancel).await
    }

    async fn exists(&self, id: &E::Key, cancel: &CancellationToken) -> Result<bool, RepositoryFault> {
        self.reads.exists(id, cancel).await
    }
}

#[async_trait]
impl<E, S> Repository<E> for DatabaseRepository<E, S>
where
    E: UniqueEntity,
    S: Session<E> + ?Sized,
{
    async fn find_by_id(
        &self,
        id: &E::Key,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, RepositoryFault> {
        self.base()
            .lookup(id, tracking, cancel)
            .await
            .map_err(storage_fault)
    }

    async fn list(
        &self,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RepositoryFault> {
        self.base()
            .queryable(tracking, cancel)
            .await
            .map_err(storage_fault)
    }

    async fn create(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        self.stage_and_save(vec![entity], DatabaseRepositoryBase::stage_add, cancel)
            .await
    }

    async fn create_range(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        self.stage_and_save(entities, DatabaseRepositoryBase::stage_add, cancel)
            .await
    }

    async fn update(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        self.stage_and_save(vec![entity], DatabaseRepositoryBase::stage_update, cancel)
            .await
    }

    async fn update_range(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        self.stage_and_save(entities, DatabaseRepositoryBase::stage_update, cancel)
            .await
    }

    async fn delete(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        self.stage_and_save(vec![entity], DatabaseRepositoryBase::stage_remove, cancel)
            .await
    }

    async fn delete_range(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        self.stage_and_save(entities, DatabaseRepositoryBase::stage_remove, cancel)
            .await
    }

    async fn delete_by_id(
        &self,
        id: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        match self.base().lookup(id, Tracking::Tracked, cancel).await {
            Ok(Some(entity)) => self.delete(entity, cancel).await,
            Ok(None) => Ok(RepositoryResult::failure(self.base().not_found(id))),
            Err(err) => self.base().read_failure(err),
        }
    }

    async fn delete_range_by_id(
        &self,
        ids: Vec<E::Key>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        let base = self.base();
        let mut missing = Vec::new();
        let mut entities = Vec::with_capacity(ids.len());

        // Every lookup must succeed before anything is staged.
        for id in &ids {
            match base.lookup(id, Tracking::Tracked, cancel).await {
                Ok(Some(entity)) => entities.push(entity),
                Ok(None) => missing.push(base.not_found(id)),
                Err(err) => return base.read_failure(err),
            }
        }

        let found = entities.len();
        for entity in entities {
            base.stage_remove(entity);
        }

        let lookup = if missing.is_empty() {
            RepositoryResult::SUCCESS
        } else if found == 0 {
            RepositoryResult::failure_with(missing)
        } else {
            RepositoryResult::partial_success_with(missing)
        };

        if found == 0 {
            tracing::debug!(entity = E::entity_name(), "No entities found to delete");
            return Ok(lookup);
        }

        tracing::debug!(
            entity = E::entity_name(),
            found,
            missing = lookup.errors().len(),
            "Deleting entities by id"
        );
        let saved = base.save_changes(found, cancel).await?;
        Ok(lookup.aggregate(saved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryDatabase, InMemorySession};
    use crate::domain::foundation::{ErrorCode, KeyValues, RepositoryResultState};
    use crate::ports::{EntryState, SessionError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory session whose `find` fails once the given call number is reached.
    struct FailingFindSession {
        inner: InMemorySession<Product>,
        finds: AtomicUsize,
        fail_from: usize,
    }

    #[async_trait]
    impl Session<Product> for FailingFindSession {
        async fn find(
            &self,
            key: &KeyValues,
            cancel: &CancellationToken,
        ) -> Result<Option<Product>, SessionError> {
            let call = self.finds.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.fail_from {
                return Err(SessionError::Query("connection reset".to_string()));
            }
            self.inner.find(key, cancel).await
        }

        async fn query_by_key(
            &self,
            key: &KeyValues,
            tracking: Tracking,
            cancel: &CancellationToken,
        ) -> Result<Option<Product>, SessionError> {
            self.inner.query_by_key(key, tracking, cancel).await
        }

        async fn query(
            &self,
            tracking: Tracking,
            cancel: &CancellationToken,
        ) -> Result<Vec<Product>, SessionError> {
            self.inner.query(tracking, cancel).await
        }

        async fn any(&self, key: &KeyValues, cancel: &CancellationToken) -> Result<bool, SessionError> {
            self.inner.any(key, cancel).await
        }

        fn stage_add(&self, key: KeyValues, entity: Product) {
            self.inner.stage_add(key, entity);
        }

        fn stage_update(&self, key: KeyValues, entity: Product) {
            self.inner.stage_update(key, entity);
        }

        fn stage_remove(&self, key: KeyValues, entity: Product) {
            self.inner.stage_remove(key, entity);
        }

        async fn persist(&self, cancel: &CancellationToken) -> Result<usize, SessionError> {
            self.inner.persist(cancel).await
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Product {
        id: i64,
        name: String,
    }

    impl UniqueEntity for Product {
        type Key = i64;

        fn id(&self) -> &i64 {
            &self.id
        }
    }

    fn product(id: i64, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
        }
    }

    fn setup() -> (
        InMemoryDatabase<Product>,
        DatabaseRepository<Product, InMemorySession<Product>>,
    ) {
        let db = InMemoryDatabase::new();
        let session = Arc::new(
            InMemorySession::new(db.clone()).with_unique_index("name", |p: &Product| p.name.clone()),
        );
        (db, DatabaseRepository::new(session))
    }

    #[tokio::test]
    async fn create_then_get_by_id() {
        let (_, repo) = setup();
        let cancel = CancellationToken::new();

        let created = repo.create(product(1, "lamp"), &cancel).await.unwrap();
        let fetched = repo.get_by_id(&1, &cancel).await.unwrap();

        assert_eq!(created, RepositoryResult::SUCCESS);
        assert_eq!(fetched.value().unwrap().name, "lamp");
    }

    #[tokio::test]
    async fn create_range_expects_one_row_per_entity() {
        let (db, repo) = setup();
        let cancel = CancellationToken::new();

        let result = repo
            .create_range(vec![product(1, "a"), product(2, "b"), product(3, "c")], &cancel)
            .await
            .unwrap();

        assert!(result.is_successful());
        assert_eq!(db.len(), 3);
    }

    #[tokio::test]
    async fn update_changes_persisted_row() {
        let (db, repo) = setup();
        let cancel = CancellationToken::new();
        repo.create(product(1, "lamp"), &cancel).await.unwrap();

        let mut tracked = repo
            .find_by_id(&1, Tracking::Tracked, &cancel)
            .await
            .unwrap()
            .unwrap();
        tracked.name = "desk lamp".to_string();

        assert!(repo.update(tracked, &cancel).await.unwrap().is_successful());
        assert_eq!(db.get(&KeyValues::single(1i64)).unwrap().name, "desk lamp");
    }

    #[tokio::test]
    async fn update_of_missing_row_is_concurrency_failure() {
        let (_, repo) = setup();
        let result = repo
            .update(product(5, "ghost"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.has_error(&ErrorCode::DatabaseConcurrencyFailure));
    }

    #[tokio::test]
    async fn unique_violation_is_update_failure() {
        let (_, repo) = setup();
        let cancel = CancellationToken::new();
        repo.create(product(1, "lamp"), &cancel).await.unwrap();

        let result = repo.create(product(2, "lamp"), &cancel).await.unwrap();

        assert!(result.has_failed());
        assert!(result.has_error(&ErrorCode::DatabaseUpdateFailure));
    }

    #[tokio::test]
    async fn delete_by_id_removes_row() {
        let (db, repo) = setup();
        let cancel = CancellationToken::new();
        repo.create(product(1, "lamp"), &cancel).await.unwrap();

        let result = repo.delete_by_id(&1, &cancel).await.unwrap();

        assert!(result.is_successful());
        assert!(db.is_empty());
    }

    #[tokio::test]
    async fn delete_by_id_of_missing_key_writes_nothing() {
        let (_, repo) = setup();
        let result = repo.delete_by_id(&42, &CancellationToken::new()).await.unwrap();

        assert_eq!(result.state(), RepositoryResultState::Failure);
        assert_eq!(result.errors().len(), 1);
        assert!(result.has_error(&ErrorCode::EntityWithKeyNotFound));
    }

    #[tokio::test]
    async fn delete_range_by_id_with_no_matches_fails_with_every_key() {
        let (_, repo) = setup();
        let result = repo
            .delete_range_by_id(vec![1, 2], &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.has_failed());
        assert_eq!(result.errors().len(), 2);
    }

    #[tokio::test]
    async fn delete_range_by_id_with_empty_input_is_success() {
        let (_, repo) = setup();
        let result = repo
            .delete_range_by_id(Vec::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, RepositoryResult::SUCCESS);
    }

    #[tokio::test]
    async fn list_with_tracking_attaches_entities() {
        let (_, repo) = setup();
        let cancel = CancellationToken::new();
        repo.create_range(vec![product(1, "a"), product(2, "b")], &cancel)
            .await
            .unwrap();
        repo.base().session().clear_tracking();

        let all = repo.list(Tracking::Tracked, &cancel).await.unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(repo.base().session().tracked_count(), 2);
    }

    #[tokio::test]
    async fn cancelled_create_stages_nothing() {
        let (db, repo) = setup();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let fault = repo.create(product(1, "lamp"), &cancel).await.unwrap_err();

        assert!(matches!(fault, RepositoryFault::Cancelled));
        assert_eq!(repo.base().session().tracked_count(), 0);
        assert!(db.is_empty());
    }

    #[tokio::test]
    async fn delete_range_by_id_read_failure_leaves_nothing_staged() {
        let db = InMemoryDatabase::with_rows([
            (KeyValues::single(1i64), product(1, "lamp")),
            (KeyValues::single(2i64), product(2, "desk")),
        ]);
        let session = Arc::new(FailingFindSession {
            inner: InMemorySession::new(db.clone()),
            finds: AtomicUsize::new(0),
            fail_from: 2,
        });
        let repo = DatabaseRepository::new(session.clone());
        let cancel = CancellationToken::new();

        let result = repo.delete_range_by_id(vec![1, 2], &cancel).await.unwrap();

        assert!(result.has_error(&ErrorCode::DatabaseReadFailure));
        assert_eq!(session.inner.entry_state(&KeyValues::single(1i64)), EntryState::Unchanged);

        let created = repo.create(product(9, "chair"), &cancel).await.unwrap();

        assert_eq!(created, RepositoryResult::SUCCESS);
        assert_eq!(db.len(), 3);
        assert!(db.contains(&KeyValues::single(1i64)));
    }
}
