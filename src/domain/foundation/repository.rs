//! Repository traits for persistence operations.
//!
//! This module provides the generic [`ReadOnlyRepository`] and
//! [`Repository`] traits that define the standard CRUD interface over any
//! [`UniqueEntity`].
//!
//! # Result model
//!
//! Every operation returns `Result<_, RepositoryFault>`:
//!
//! - `Err` interrupts the caller: cancellation, invalid arguments.
//! - `Ok(RepositoryResult)` is the data outcome, including not-found,
//!   write-count mismatches and database update failures.
//!
//! # Example
//!
//! ```ignore
//! // Domain-specific repository extends the base trait
//! #[async_trait]
//! pub trait CustomerRepository: Repository<Customer> {
//!     async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryFault>;
//! }
//!
//! // The handler only needs to know about the trait
//! pub struct RenameCustomerHandler {
//!     repo: Arc<dyn CustomerRepository>,
//! }
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{RepositoryFault, RepositoryResult, Tracking, UniqueEntity};

/// Read access to a set of entities.
#[async_trait]
pub trait ReadOnlyRepository<E: UniqueEntity>: Send + Sync {
    /// Gets an entity by its key through the untracked read path.
    ///
    /// Returns `Failure(EntityWithKeyNotFound)` when no entity has the key.
    async fn get_by_id(
        &self,
        id: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult<E>, RepositoryFault>;

    /// Gets every entity as detached snapshots. The list may be empty.
    async fn get_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult<Vec<E>>, RepositoryFault>;

    /// Checks if an entity with the given key exists.
    ///
    /// # Errors
    ///
    /// `Storage` when the session cannot answer.
    async fn exists(&self, id: &E::Key, cancel: &CancellationToken) -> Result<bool, RepositoryFault>;
}

/// Full CRUD access to a set of entities.
///
/// Each mutating operation stages its changes and persists them in one
/// save, comparing the number of written rows with the number of staged
/// entities.
///
/// # Failed saves
///
/// A save rejected with `DatabaseUpdateFailure` or
/// `DatabaseConcurrencyFailure` leaves the rejected changes tracked by the
/// session, so every later save on that session retries them and fails the
/// same way. Discard the session (or clear its tracking) after such a
/// failure.
#[async_trait]
pub trait Repository<E: UniqueEntity>: ReadOnlyRepository<E> {
    /// Looks an entity up with explicit tracking.
    ///
    /// Tracked lookups consult the session's identity map first.
    async fn find_by_id(
        &self,
        id: &E::Key,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, RepositoryFault>;

    /// Lists every entity with explicit tracking.
    async fn list(
        &self,
        tracking: Tracking,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RepositoryFault>;

    async fn create(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault>;

    async fn create_range(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault>;

    async fn update(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault>;

    async fn update_range(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault>;

    async fn delete(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault>;

    async fn delete_range(
        &self,
        entities: Vec<E>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault>;

    /// Deletes the entity with the given key.
    ///
    /// Returns `Failure(EntityWithKeyNotFound)` without writing when the key
    /// is unknown.
    async fn delete_by_id(
        &self,
        id: &E::Key,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault>;

    /// Deletes every entity whose key is in `ids`.
    ///
    /// Missing keys each contribute one `EntityWithKeyNotFound` error; the
    /// found entities are still deleted and the result is `PartialSuccess`.
    /// When no key is found nothing is persisted and the result is `Failure`.
    async fn delete_range_by_id(
        &self,
        ids: Vec<E::Key>,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault>;
}
