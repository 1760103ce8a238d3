//! Convenience operations composed from the [`Repository`] primitives.
//!
//! Available on every repository, including trait objects:
//!
//! ```ignore
//! use tracked_repository::application::RepositoryExt;
//!
//! let result = repo
//!     .get_or_create(&user_id, |id| User::new(id.clone()), &cancel)
//!     .await?;
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::foundation::{
    Repository, RepositoryFault, RepositoryResult, Tracking, UniqueEntity,
};

/// Extension operations for any [`Repository`].
#[async_trait]
pub trait RepositoryExt<E: UniqueEntity>: Repository<E> {
    /// Creates an entity unless one with `id` already exists.
    ///
    /// The factory is only called when the entity is missing; an existing
    /// entity yields `SUCCESS` without writing.
    async fn try_create<F>(
        &self,
        id: &E::Key,
        factory: F,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault>
    where
        F: FnOnce(&E::Key) -> E + Send;

    /// Returns the entity with `id`, creating it first when it does not exist.
    ///
    /// A failed creation returns `Failure` with the creation errors.
    async fn get_or_create<F>(
        &self,
        id: &E::Key,
        factory: F,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult<E>, RepositoryFault>
    where
        F: FnOnce(&E::Key) -> E + Send;

    /// Updates the entity when its key is assigned and stored, creates it otherwise.
    async fn create_or_update(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault>;
}

#[async_trait]
impl<E, R> RepositoryExt<E> for R
where
    E: UniqueEntity,
    R: Repository<E> + ?Sized,
{
    async fn try_create<F>(
        &self,
        id: &E::Key,
        factory: F,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault>
    where
        F: FnOnce(&E::Key) -> E + Send,
    {
        if self.exists(id, cancel).await? {
            return Ok(RepositoryResult::SUCCESS);
        }
        self.create(factory(id), cancel).await
    }

    async fn get_or_create<F>(
        &self,
        id: &E::Key,
        factory: F,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult<E>, RepositoryFault>
    where
        F: FnOnce(&E::Key) -> E + Send,
    {
        let existing = self.get_by_id(id, cancel).await?;
        if existing.is_successful() {
            return Ok(existing);
        }

        let entity = factory(id);
        let created = self.create(entity.clone(), cancel).await?;
        if !created.is_successful() {
            return Ok(RepositoryResult::failure_with(created.into_errors()));
        }

        // The session may have stamped the stored copy while saving.
        let stored = self
            .find_by_id(entity.id(), Tracking::Tracked, cancel)
            .await?;
        Ok(RepositoryResult::success(stored.unwrap_or(entity)))
    }

    async fn create_or_update(
        &self,
        entity: E,
        cancel: &CancellationToken,
    ) -> Result<RepositoryResult, RepositoryFault> {
        let id = entity.id();
        if *id != E::Key::default() && self.exists(id, cancel).await? {
            self.update(entity, cancel).await
        } else {
            self.create(entity, cancel).await
        }
    }
}
