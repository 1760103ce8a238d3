//! Database-backed repository implementations.

mod base;
mod database;
mod read_only;

pub use base::{reconcile_write_count, DatabaseRepositoryBase};
pub use database::DatabaseRepository;
pub use read_only::ReadOnlyDatabaseRepository;
