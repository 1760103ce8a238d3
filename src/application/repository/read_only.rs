//! Read-only repository over a change-tracking session.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::base::{storage_fault, DatabaseRepositoryBase};
use crate::domain::foundation::{
    CompositeKey, ErrorDescriber, KeyProvider, KeyValue, ReadOnlyRepository, RepositoryFault,
    RepositoryResult, Tracking, UniqueEntity,
};
use crate::ports::Session;

/// [`ReadOnlyRepository`] implementation reading through a [`Session`].
///
/// Reads are untracked; entities returned here cannot be updated through
/// the session without being staged again.
pub struct ReadOnlyDatabaseRepository<E: UniqueEntity, S: ?Sized> {
    base: DatabaseRepositoryBase<E, S>,
}

impl<E: UniqueEntity, S: ?Sized> Clone for ReadOnlyDatabaseRepository<E, S> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
        }
    }
}

impl<E, S> ReadOnlyDatabaseRepository<E, S>
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
        Self { base }
    }

    pub fn with_describer(self, describer: Arc<dyn ErrorDescriber>) -> Self {
        Self::from_base(self.base.with_describer(describer))
    }

    pub fn base(&self) -> &DatabaseRepositoryBase<E, S> {
        &self.base
    }
}

#[async_trait]
impl<E, S> ReadOnlyRepository<E> for ReadOnlyDatabaseRepository<E, S>
where
    E: UniqueEntity,
    S: Session<E> + ?Sized,
{
    async fn get_by_id(
        &self,
        id: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult<E>, RepositoryFault> {
        match self.base.lookup(id, Tracking::Untracked, cancel).await {
            Ok(Some(entity)) => Ok(RepositoryResult::success(entity)),
            Ok(None) => {
                tracing::debug!(entity = E::entity_name(), key = ?id, "Entity not found");
                Ok(RepositoryResult::failure(self.base.not_found(id)))
            }
            Err(err) => self.base.read_failure(err),
        }
    }

    async fn get_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult<Vec<E>>, RepositoryFault> {
        match self.base.queryable(Tracking::Untracked, cancel).await {
            Ok(entities) => Ok(RepositoryResult::success(entities)),
            Err(err) => self.base.read_failure(err),
        }
    }

    async fn exists(&self, id: &E::Key, cancel: &CancellationToken) -> Result<bool, RepositoryFault> {
        self.base.contains(id, cancel).await.map_err(storage_fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryDatabase, InMemorySession};
    use crate::domain::foundation::{ErrorCode, KeyValues};

    #[derive(Debug, Clone, PartialEq)]
    struct Country {
        code: String,
        name: String,
    }

    impl UniqueEntity for Country {
        type Key = String;

        fn id(&self) -> &String {
            &self.code
        }
    }

    fn country(code: &str, name: &str) -> Country {
        Country {
            code: code.to_string(),
            name: name.to_string(),
        }
    }

    fn repository(
        rows: &[Country],
    ) -> ReadOnlyDatabaseRepository<Country, InMemorySession<Country>> {
        let db = InMemoryDatabase::with_rows(
            rows.iter()
                .map(|c| (KeyValues::single(c.code.clone()), c.clone())),
        );
        ReadOnlyDatabaseRepository::new(Arc::new(InMemorySession::new(db)))
    }

    #[tokio::test]
    async fn get_by_id_returns_entity() {
        let repo = repository(&[country("NO", "Norway")]);
        let result = repo
            .get_by_id(&"NO".to_string(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.value().unwrap().name, "Norway");
    }

    #[tokio::test]
    async fn get_by_id_does_not_track() {
        let repo = repository(&[country("NO", "Norway")]);
        repo.get_by_id(&"NO".to_string(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(repo.base().session().tracked_count(), 0);
    }

    #[tokio::test]
    async fn get_by_id_reports_missing_key() {
        let repo = repository(&[]);
        let result = repo
            .get_by_id(&"SE".to_string(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.has_failed());
        assert!(result.has_error(&ErrorCode::EntityWithKeyNotFound));
        assert!(result.value().is_err());
    }

    #[tokio::test]
    async fn get_all_returns_empty_list_as_success() {
        let repo = repository(&[]);
        let result = repo.get_all(&CancellationToken::new()).await.unwrap();

        assert!(result.is_successful());
        assert!(result.value().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exists_checks_persisted_rows() {
        let repo = repository(&[country("NO", "Norway")]);
        let cancel = CancellationToken::new();

        assert!(repo.exists(&"NO".to_string(), &cancel).await.unwrap());
        assert!(!repo.exists(&"DK".to_string(), &cancel).await.unwrap());
    }

    #[tokio::test]
    async fn cancelled_reads_are_faults() {
        let repo = repository(&[country("NO", "Norway")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            repo.get_by_id(&"NO".to_string(), &cancel).await,
            Err(RepositoryFault::Cancelled)
        ));
        assert!(matches!(
            repo.exists(&"NO".to_string(), &cancel).await,
            Err(RepositoryFault::Cancelled)
        ));
    }
}
