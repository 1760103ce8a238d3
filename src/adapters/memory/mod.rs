//! In-memory persistence adapters.

mod in_memory_database;
mod in_memory_session;

pub use in_memory_database::InMemoryDatabase;
pub use in_memory_session::InMemorySession;
