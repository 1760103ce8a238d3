//! Manually driven clock for testing.

use std::sync::{Mutex, PoisonError};

use chrono::Duration;

use crate::domain::foundation::Timestamp;
use crate::ports::Clock;

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Creates a clock stopped at the given Unix time.
    ///
    /// Falls back to the epoch when `secs` is out of range.
    pub fn at_unix_secs(secs: i64) -> Self {
        let start = Timestamp::from_unix_secs(secs)
            .or_else(|| Timestamp::from_unix_secs(0))
            .unwrap_or_default();
        Self::new(start)
    }

    pub fn set(&self, at: Timestamp) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.plus(by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
