//! Factory for the well-known repository errors.
//!
//! Repositories build every error they report through an [`ErrorDescriber`],
//! so descriptions can be localized or reworded by overriding individual
//! methods while the codes stay stable.

use super::errors::{ErrorCause, ErrorCode, RepositoryError};
use super::keys::KeyValues;

/// Builds the errors a repository reports.
pub trait ErrorDescriber: Send + Sync {
    fn entity_with_key_not_found(&self, entity: &str, key: &KeyValues) -> RepositoryError {
        RepositoryError::new(
            ErrorCode::EntityWithKeyNotFound,
            format!("Entity '{}' with key '{}' was not found.", entity, key),
        )
    }

    fn nothing_written_to_database(&self) -> RepositoryError {
        RepositoryError::new(
            ErrorCode::NothingWrittenToDatabase,
            "Nothing was written to the database.",
        )
    }

    fn unexpected_database_write_count(&self, expected: usize, written: usize) -> RepositoryError {
        RepositoryError::new(
            ErrorCode::UnexpectedDatabaseWriteCount,
            format!(
                "Expected {} entities to be written to the database, but {} were written.",
                expected, written
            ),
        )
    }

    fn database_concurrency_failure(&self, cause: ErrorCause) -> RepositoryError {
        RepositoryError::new(ErrorCode::DatabaseConcurrencyFailure, cause.to_string())
            .with_cause(cause)
    }

    fn database_update_failure(&self, cause: ErrorCause) -> RepositoryError {
        RepositoryError::new(ErrorCode::DatabaseUpdateFailure, cause.to_string()).with_cause(cause)
    }

    fn database_read_failure(&self, cause: ErrorCause) -> RepositoryError {
        RepositoryError::new(ErrorCode::DatabaseReadFailure, cause.to_string()).with_cause(cause)
    }
}

/// Describer using the built-in English descriptions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorDescriber;

impl ErrorDescriber for DefaultErrorDescriber {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, thiserror::Error)]
    #[error("row version changed")]
    struct RowVersionChanged;

    struct TerseDescriber;

    impl ErrorDescriber for TerseDescriber {
        fn nothing_written_to_database(&self) -> RepositoryError {
            RepositoryError::new(ErrorCode::NothingWrittenToDatabase, "0 rows")
        }
    }

    #[test]
    fn not_found_mentions_entity_and_key() {
        let err = DefaultErrorDescriber
            .entity_with_key_not_found("Widget", &KeyValues::single(42i64));

        assert_eq!(err.code(), &ErrorCode::EntityWithKeyNotFound);
        assert_eq!(err.description(), "Entity 'Widget' with key '42' was not found.");
    }

    #[test]
    fn write_count_mismatch_mentions_both_counts() {
        let err = DefaultErrorDescriber.unexpected_database_write_count(3, 2);

        assert_eq!(err.code(), &ErrorCode::UnexpectedDatabaseWriteCount);
        assert!(err.description().contains('3'));
        assert!(err.description().contains('2'));
    }

    #[test]
    fn concurrency_failure_keeps_cause() {
        let err = DefaultErrorDescriber.database_concurrency_failure(Arc::new(RowVersionChanged));

        assert_eq!(err.code(), &ErrorCode::DatabaseConcurrencyFailure);
        assert_eq!(err.description(), "row version changed");
        assert!(err.cause().is_some());
    }

    #[test]
    fn overridden_description_keeps_code() {
        let err = TerseDescriber.nothing_written_to_database();

        assert_eq!(err.code(), &ErrorCode::NothingWrittenToDatabase);
        assert_eq!(err.description(), "0 rows");
    }
}
