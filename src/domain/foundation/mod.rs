//! Foundation module - Shared repository primitives.
//!
//! Contains the result algebra, error types, entity contracts, key
//! handling and the repository traits that form the vocabulary of the
//! crate.

mod describer;
mod entity;
mod errors;
mod keys;
mod repository;
mod result;
mod timestamp;

pub use describer::{DefaultErrorDescriber, ErrorDescriber};
pub use entity::{Timestamped, Tracking, UniqueEntity};
pub use errors::{ErrorCause, ErrorCode, RepositoryError, RepositoryFault};
pub use keys::{
    CompositeKey, CompositeKeyProvider, KeyProvider, KeyValue, KeyValues, SingleKeyProvider,
};
pub use repository::{ReadOnlyRepository, Repository};
pub use result::{RepositoryResult, RepositoryResultState};
pub use timestamp::Timestamp;
