//! Wall-clock time source.

use crate::domain::foundation::Timestamp;
use crate::ports::Clock;

/// Clock reading the system time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_moves_forward() {
        let first = SystemClock.now();
        let second = SystemClock.now();
        assert!(!second.is_before(&first));
    }
}
