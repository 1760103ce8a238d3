//! Caching decorator for repositories.
//!
//! [`CachedRepository`] serves `get_by_id` and `get_all` from a [`Cache`],
//! falling back to the wrapped repository on a miss. Not-found failures are
//! cached too, so a missing key is not looked up again until a write
//! invalidates it. Read failures are never cached.
//!
//! # Cache keys
//!
//! ```text
//! {Entity}_ById_{key values}   single entity result
//! {Entity}_All                 all entities result
//! ```
//!
//! Every write removes the by-id entries of the entities it touches and the
//! all-entities entry, whatever the outcome of the write. Tracked reads
//! (`find_by_id`, `list`) always go to the wrapped repository.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::CacheConfig;
use crate::domain::foundation::{
    ErrorCode, KeyProvider, ReadOnlyRepository, Repository, RepositoryFault, RepositoryResult,
    Tracking, UniqueEntity,
};
use crate::ports::{Cache, CacheEntryOptions, CachePriority};

/// Weight of a cached entity, counted against the cache size limit.
pub type EntitySizer<E> = Arc<dyn Fn(&E) -> u64 + Send + Sync>;

/// Value stored in the cache by [`CachedRepository`].
#[derive(Debug, Clone, PartialEq)]
pub enum CachedEntry<E> {
    Single(RepositoryResult<E>),
    Many(RepositoryResult<Vec<E>>),
}

/// Entry options applied by [`CachedRepository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachingOptions {
    /// Expiration of cached successes and failures. `None` never expires.
    pub expiration: Option<Duration>,

    /// Priority of cached successes. Failures are always cached at `Low`.
    pub priority: CachePriority,

    /// Whether not-found results are cached.
    pub cache_failures: bool,
}

impl Default for CachingOptions {
    fn default() -> Self {
        Self {
            expiration: None,
            priority: CachePriority::Normal,
            cache_failures: true,
        }
    }
}

impl From<&CacheConfig> for CachingOptions {
    fn from(config: &CacheConfig) -> Self {
        Self {
            expiration: config.expiration(),
            priority: CachePriority::Normal,
            cache_failures: config.cache_failures,
        }
    }
}

/// Repository decorator caching reads in a [`Cache`].
pub struct CachedRepository<E: UniqueEntity, R: ?Sized, C: ?Sized> {
    inner: Arc<R>,
    cache: Arc<C>,
    key_provider: Arc<dyn KeyProvider<E::Key>>,
    sizer: EntitySizer<E>,
    options: CachingOptions,
}

impl<E, R, C> CachedRepository<E, R, C>
where
    E: UniqueEntity,
    R: ReadOnlyRepository<E> + ?Sized,
    C: Cache<CachedEntry<E>> + ?Sized,
{
    pub fn new(
        inner: Arc<R>,
        cache: Arc<C>,
        key_provider: Arc<dyn KeyProvider<E::Key>>,
        sizer: EntitySizer<E>,
    ) -> Self {
        Self {
            inner,
            cache,
            key_provider,
            sizer,
            options: CachingOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CachingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn inner(&self) -> &Arc<R> {
        &self.inner
    }

    fn by_id_key(&self, id: &E::Key) -> String {
        format!(
            "{}_ById_{}",
            E::entity_name(),
            self.key_provider.key_values(id)
        )
    }

    fn all_key() -> String {
        format!("{}_All", E::entity_name())
    }

    fn store<T>(&self, key: String, entry: CachedEntry<E>, result: &RepositoryResult<T>, size: u64) {
        let options = if result.is_successful() {
            CacheEntryOptions::new(size).with_priority(self.options.priority)
        } else if self.options.cache_failures && is_not_found(result) {
            CacheEntryOptions::new(0).with_priority(CachePriority::Low)
        } else {
            return;
        };
        self.cache
            .set(key, entry, options.with_expiration(self.options.expiration));
    }

    fn invalidate<'a>(&self, ids: impl IntoIterator<Item = &'a E::Key>) {
        for id in ids {
            self.cache.remove(&self.by_id_key(id));
        }
        self.cache.remove(&Self::all_key());
    }
}

/// A failure carrying only missing-key errors is a data outcome; anything
/// else may be transient.
fn is_not_found<T>(result: &RepositoryResult<T>) -> bool {
    !result.errors().is_empty()
        && result
            .errors()
            .iter()
            .all(|error| *error.code() == ErrorCode::EntityWithKeyNotFound)
}

#[async_trait]
impl<E, R, C> ReadOnlyRepository<E> for CachedRepository<E, R, C>
where
    E: UniqueEntity,
    R: ReadOnlyRepository<E> + ?Sized,
    C: Cache<CachedEntry<E>> + ?Sized,
{
    async fn get_by_id(
        &self,
        id: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult<E>, RepositoryFault> {
        let key = self.by_id_key(id);
        if let Some(CachedEntry::Single(cached)) = self.cache.get(&key) {
            tracing::trace!(key = %key, "Cache hit");
            return Ok(cached);
        }

        let result = self.inner.get_by_id(id, cancel).await?;
        let size = result.value_or_none().map_or(0, |entity| (self.sizer)(entity));
        self.store(
            key,
            CachedEntry::Single(result.clone()),
            &result,
            size,
        );
        Ok(result)
    }

    async fn get_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult<Vec<E>>, RepositoryFault> {
        let key = Self::all_key();
        if let Some(CachedEntry::Many(cached)) = self.cache.get(&key) {
            tracing::trace!(key = %key, "Cache hit");
            return Ok(cached);
        }

        let result = self.inner.get_all(cancel).await?;
        let size = result
            .value_or_none()
            .map_or(0, |entities| entities.iter().map(|e| (self.sizer)(e)).sum());
        self.store(
            key,
            CachedEntry::Many(result.clone()),
            &result,
            size,
        );
        Ok(result)
    }

    async fn exists(&self, id: &E::Key, cancel: &CancellationToken) -> Result<bool, RepositoryFault> {
        if let Some(CachedEntry::Single(cached)) = self.cache.get(&self.by_id_key(id)) {
            if cached.is_successful() {
                return Ok(true);
            }
            if cached.has_error(&ErrorCode::EntityWithKeyNotFound) {
                return Ok(false);
            }
        }
        self.inner.exists(id, cancel).await
    }
}

#[async_trait]
impl<E, R, C> Repository<E> for CachedRepository<E, R, C>
where
    E: UniqueEntity,
    R: Repository<E> + ?Sized,
    C: Cache<CachedEntry<E>> + ?Sized,
{
    async fn find_by_id(
        &self,
        id: &E::Key,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, RepositoryFault> {
        self.inner.find_by_id(id, tracking, cancel).await
    }

    async fn list(
        &self,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RepositoryFault> {
        self.inner.list(tracking, cancel).await
    }

    async fn create(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        let id = entity.id().clone();
        let result = self.inner.create(entity, cancel).await;
        self.invalidate([&id]);
        result
    }

    async fn create_range(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        let ids: Vec<E::Key> = entities.iter().map(|e| e.id().clone()).collect();
        let result = self.inner.create_range(entities, cancel).await;
        self.invalidate(&ids);
        result
    }

    async fn update(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        let id = entity.id().clone();
        let result = self.inner.update(entity, cancel).await;
        self.invalidate([&id]);
        result
    }

    async fn update_range(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        let ids: Vec<E::Key> = entities.iter().map(|e| e.id().clone()).collect();
        let result = self.inner.update_range(entities, cancel).await;
        self.invalidate(&ids);
        result
    }

    async fn delete(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        let id = entity.id().clone();
        let result = self.inner.delete(entity, cancel).await;
        self.invalidate([&id]);
        result
    }

    async fn delete_range(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        let ids: Vec<E::Key> = entities.iter().map(|e| e.id().clone()).collect();
        let result = self.inner.delete_range(entities, cancel).await;
        self.invalidate(&ids);
        result
    }

    async fn delete_by_id(
        &self,
        id: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        let result = self.inner.delete_by_id(id, cancel).await;
        self.invalidate([id]);
        result
    }

    async fn delete_range_by_id(
        &self,
        ids: Vec<E::Key>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        let result = self.inner.delete_range_by_id(ids.clone(), cancel).await;
        self.invalidate(&ids);
        result
    }
}
