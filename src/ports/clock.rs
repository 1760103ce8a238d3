//! Clock port - Source of the current time.

use crate::domain::foundation::Timestamp;

/// Port for reading the current UTC time.
///
/// Injected wherever "now" matters so tests can control time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
