//! Application layer - Repository implementations and decorators.
//!
//! Builds the [`Repository`](crate::domain::foundation::Repository) contract on
//! top of the session port:
//!
//! - `repository`: database-backed repositories and the write-reconciliation core
//! - `extensions`: try-create, get-or-create, create-or-update
//! - `timestamps`: pre-save interceptor stamping timestamped entities
//! - `cached`: read-caching decorator

pub mod cached;
pub mod extensions;
pub mod repository;
pub mod timestamps;

pub use cached::{CachedEntry, CachedRepository, CachingOptions, EntitySizer};
pub use extensions::RepositoryExt;
pub use repository::{
    reconcile_write_count, DatabaseRepository, DatabaseRepositoryBase, ReadOnlyDatabaseRepository,
};
pub use timestamps::TimestampInterceptor;
