//! Tri-state outcome of repository operations.
//!
//! `RepositoryResult<T = ()>` carries a [`RepositoryResultState`], the errors
//! collected while producing it and, for successful typed results, a value.
//! The unit instantiation plays the role of the untyped result.
//!
//! # Combination
//!
//! [`RepositoryResult::aggregate`] combines two outcomes: the state is the
//! more severe of the two and the errors are concatenated in call order.
//! Aggregation is associative; it is commutative in state but not in the
//! order of errors.

use std::fmt;

use super::errors::{ErrorCode, RepositoryError, RepositoryFault};

/// Severity-ordered outcome state. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RepositoryResultState {
    /// The operation succeeded without errors.
    Success,

    /// Some of the work succeeded; the errors describe the rest.
    PartialSuccess,

    /// The operation failed.
    Failure,
}

impl fmt::Display for RepositoryResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepositoryResultState::Success => "Success",
            RepositoryResultState::PartialSuccess => "PartialSuccess",
            RepositoryResultState::Failure => "Failure",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a repository operation.
///
/// The value is present if and only if the state is `Success`.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryResult<T = ()> {
    state: RepositoryResultState,
    errors: Vec<RepositoryError>,
    value: Option<T>,
}

impl RepositoryResult<()> {
    /// The canonical successful result without errors.
    pub const SUCCESS: RepositoryResult<()> = RepositoryResult {
        state: RepositoryResultState::Success,
        errors: Vec::new(),
        value: Some(()),
    };
}

impl<T> RepositoryResult<T> {
    /// Creates a successful result carrying `value`.
    pub fn success(value: T) -> Self {
        Self {
            state: RepositoryResultState::Success,
            errors: Vec::new(),
            value: Some(value),
        }
    }

    /// Creates a failed result from a single error.
    pub fn failure(error: RepositoryError) -> Self {
        Self::failure_with([error])
    }

    /// Creates a failed result from a collection of errors.
    ///
    /// An empty collection is accepted; the state is still `Failure`.
    pub fn failure_with(errors: impl IntoIterator<Item = RepositoryError>) -> Self {
        Self::from_parts(RepositoryResultState::Failure, errors.into_iter().collect())
    }

    /// Creates a partially successful result from a single error.
    pub fn partial_success(error: RepositoryError) -> Self {
        Self::partial_success_with([error])
    }

    /// Creates a partially successful result from a collection of errors.
    pub fn partial_success_with(errors: impl IntoIterator<Item = RepositoryError>) -> Self {
        Self::from_parts(
            RepositoryResultState::PartialSuccess,
            errors.into_iter().collect(),
        )
    }

    fn from_parts(state: RepositoryResultState, errors: Vec<RepositoryError>) -> Self {
        debug_assert!(state != RepositoryResultState::Success);
        Self {
            state,
            errors,
            value: None,
        }
    }

    pub fn state(&self) -> RepositoryResultState {
        self.state
    }

    pub fn errors(&self) -> &[RepositoryError] {
        &self.errors
    }

    /// Consumes the result, returning its errors.
    pub fn into_errors(self) -> Vec<RepositoryError> {
        self.errors
    }

    pub fn is_successful(&self) -> bool {
        self.state == RepositoryResultState::Success
    }

    pub fn is_partial_success(&self) -> bool {
        self.state == RepositoryResultState::PartialSuccess
    }

    pub fn has_failed(&self) -> bool {
        self.state == RepositoryResultState::Failure
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Checks whether any contained error carries `code`.
    pub fn has_error(&self, code: &ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code() == code)
    }

    /// Returns the value of a successful result.
    ///
    /// # Errors
    ///
    /// `RepositoryFault::InvalidState` when the operation was unsuccessful.
    pub fn value(&self) -> Result<&T, RepositoryFault> {
        self.value
            .as_ref()
            .ok_or_else(|| RepositoryFault::invalid_state("The operation was unsuccessful."))
    }

    /// Consumes the result, returning the value of a successful result.
    ///
    /// # Errors
    ///
    /// `RepositoryFault::InvalidState` when the operation was unsuccessful.
    pub fn into_value(self) -> Result<T, RepositoryFault> {
        self.value
            .ok_or_else(|| RepositoryFault::invalid_state("The operation was unsuccessful."))
    }

    /// Returns the value if the operation succeeded, `None` otherwise.
    pub fn value_or_none(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Drops the value, keeping state and errors.
    pub fn without_value(self) -> RepositoryResult {
        RepositoryResult {
            value: (self.state == RepositoryResultState::Success).then_some(()),
            state: self.state,
            errors: self.errors,
        }
    }

    /// Maps the value of a successful result.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RepositoryResult<U> {
        RepositoryResult {
            state: self.state,
            errors: self.errors,
            value: self.value.map(f),
        }
    }

    /// Combines two outcomes into the worse state with concatenated errors.
    pub fn aggregate<U>(self, other: RepositoryResult<U>) -> RepositoryResult {
        let state = self.state.max(other.state);
        let mut errors = self.errors;
        errors.extend(other.errors);

        RepositoryResult {
            state,
            errors,
            value: (state == RepositoryResultState::Success).then_some(()),
        }
    }

    /// Re-types the result, attaching `value` when the result is successful.
    ///
    /// For non-successful results the value is discarded.
    ///
    /// # Errors
    ///
    /// `RepositoryFault::InvalidArgument` when the result is successful and
    /// `value` is `None`.
    pub fn with_value<U>(self, value: Option<U>) -> Result<RepositoryResult<U>, RepositoryFault> {
        match self.state {
            RepositoryResultState::Success => value
                .map(RepositoryResult::success)
                .ok_or_else(|| {
                    RepositoryFault::invalid_argument(
                        "value",
                        "a successful result requires a value",
                    )
                }),
            state => Ok(RepositoryResult::from_parts(state, self.errors)),
        }
    }
}

impl<T> From<RepositoryError> for RepositoryResult<T> {
    fn from(error: RepositoryError) -> Self {
        RepositoryResult::failure(error)
    }
}

impl<T> fmt::Display for RepositoryResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} errors)", self.state, self.errors.len())
    }
}
