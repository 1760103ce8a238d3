//! Error types for the repository layer.
//!
//! Two channels exist:
//! - [`RepositoryError`] values travel inside a `RepositoryResult` and describe
//!   data outcomes (not found, write count mismatch, update failures).
//! - [`RepositoryFault`] is returned as `Err` and interrupts the caller
//!   (invalid arguments, invalid state access, cancellation).

use std::error::Error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// Shared, type-erased underlying cause of a [`RepositoryError`].
pub type ErrorCause = Arc<dyn Error + Send + Sync + 'static>;

/// Stable error codes.
///
/// The string form is part of the public contract: callers match on it
/// across process boundaries, so it never changes for the known codes.
#[derive(Debug, Clone)]
pub enum ErrorCode {
    EntityWithKeyNotFound,
    UnexpectedDatabaseWriteCount,
    NothingWrittenToDatabase,
    DatabaseConcurrencyFailure,
    DatabaseUpdateFailure,
    DatabaseReadFailure,

    /// Caller-defined code.
    Custom(String),
}

impl ErrorCode {
    /// Creates a caller-defined code, normalizing to a known code when the
    /// text matches one.
    pub fn custom(code: impl Into<String>) -> Self {
        let code = code.into();
        match code.as_str() {
            "EntityWithKeyNotFound" => ErrorCode::EntityWithKeyNotFound,
            "UnexpectedDatabaseWriteCount" => ErrorCode::UnexpectedDatabaseWriteCount,
            "NothingWrittenToDatabase" => ErrorCode::NothingWrittenToDatabase,
            "DatabaseConcurrencyFailure" => ErrorCode::DatabaseConcurrencyFailure,
            "DatabaseUpdateFailure" => ErrorCode::DatabaseUpdateFailure,
            "DatabaseReadFailure" => ErrorCode::DatabaseReadFailure,
            _ => ErrorCode::Custom(code),
        }
    }

    /// Returns the stable string identifier.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::EntityWithKeyNotFound => "EntityWithKeyNotFound",
            ErrorCode::UnexpectedDatabaseWriteCount => "UnexpectedDatabaseWriteCount",
            ErrorCode::NothingWrittenToDatabase => "NothingWrittenToDatabase",
            ErrorCode::DatabaseConcurrencyFailure => "DatabaseConcurrencyFailure",
            ErrorCode::DatabaseUpdateFailure => "DatabaseUpdateFailure",
            ErrorCode::DatabaseReadFailure => "DatabaseReadFailure",
            ErrorCode::Custom(code) => code,
        }
    }
}

impl PartialEq for ErrorCode {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ErrorCode {}

impl Hash for ErrorCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        ErrorCode::custom(code)
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        ErrorCode::custom(code)
    }
}

/// Immutable description of one failed repository outcome.
///
/// Equality is by value: code, description and the rendered cause.
#[derive(Debug, Clone)]
pub struct RepositoryError {
    code: ErrorCode,
    description: String,
    cause: Option<ErrorCause>,
}

impl RepositoryError {
    /// Creates an error without an underlying cause.
    pub fn new(code: impl Into<ErrorCode>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            cause: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_cause(mut self, cause: ErrorCause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Builds an error from an arbitrary error value.
    ///
    /// The code is the error type's name with a trailing `Error` removed
    /// (`ConnectionResetError` becomes `ConnectionReset`).
    pub fn from_error<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        let code = code_from_type_name(std::any::type_name::<E>());
        let description = err.to_string();
        Self::new(code, description).with_cause(Arc::new(err))
    }

    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the underlying cause, if any.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

fn code_from_type_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let name = base.rsplit("::").next().unwrap_or(base);
    match name.len().checked_sub("error".len()) {
        Some(idx)
            if idx > 0
                && name.is_char_boundary(idx)
                && name[idx..].eq_ignore_ascii_case("error") =>
        {
            name[..idx].to_string()
        }
        _ => name.to_string(),
    }
}

impl PartialEq for RepositoryError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.description == other.description
            && self.cause.as_ref().map(|c| c.to_string())
                == other.cause.as_ref().map(|c| c.to_string())
    }
}

impl Eq for RepositoryError {}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)
    }
}

impl Error for RepositoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
    }
}

/// Conditions that interrupt the caller instead of being encoded in a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryFault {
    #[error("Argument '{name}' is invalid: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("The operation was cancelled")]
    Cancelled,

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl RepositoryFault {
    /// Creates an invalid argument fault.
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        RepositoryFault::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Creates an invalid state fault.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        RepositoryFault::InvalidState(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("connection reset by peer")]
    struct ConnectionResetError;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn error_code_displays_stable_identifier() {
        assert_eq!(format!("{}", ErrorCode::EntityWithKeyNotFound), "EntityWithKeyNotFound");
        assert_eq!(
            format!("{}", ErrorCode::UnexpectedDatabaseWriteCount),
            "UnexpectedDatabaseWriteCount"
        );
        assert_eq!(format!("{}", ErrorCode::custom("Quota")), "Quota");
    }

    #[test]
    fn custom_code_matching_known_code_is_equal_to_it() {
        assert_eq!(ErrorCode::from("NothingWrittenToDatabase"), ErrorCode::NothingWrittenToDatabase);
        assert_eq!(
            ErrorCode::Custom("DatabaseUpdateFailure".to_string()),
            ErrorCode::DatabaseUpdateFailure
        );
    }

    #[test]
    fn repository_error_displays_code_and_description() {
        let err = RepositoryError::new(ErrorCode::NothingWrittenToDatabase, "Nothing was written.");
        assert_eq!(format!("{}", err), "[NothingWrittenToDatabase] Nothing was written.");
    }

    #[test]
    fn repository_errors_compare_by_value() {
        let a = RepositoryError::new("Quota", "limit reached");
        let b = RepositoryError::new("Quota", "limit reached");
        let c = RepositoryError::new("Quota", "other");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, b.clone().with_cause(Arc::new(Boom)));
    }

    #[test]
    fn from_error_strips_error_suffix_and_keeps_cause() {
        let err = RepositoryError::from_error(ConnectionResetError);

        assert_eq!(err.code().as_str(), "ConnectionReset");
        assert_eq!(err.description(), "connection reset by peer");
        assert!(err.cause().is_some());
        assert!(err.source().is_some());
    }

    #[test]
    fn from_error_keeps_name_without_suffix() {
        let err = RepositoryError::from_error(Boom);
        assert_eq!(err.code().as_str(), "Boom");
    }

    #[test]
    fn fault_displays_argument_name() {
        let fault = RepositoryFault::invalid_argument("value", "must be present");
        assert_eq!(format!("{}", fault), "Argument 'value' is invalid: must be present");
    }
}
