//! Pre-save interceptor stamping creation and update times.

use std::sync::Arc;

use crate::domain::foundation::Timestamped;
use crate::ports::{Clock, EntityEntry, EntryState, SaveInterceptor};

/// Stamps [`Timestamped`] entities right before they are persisted.
///
/// The clock is read once per save, so every entity written together
/// carries the same instant:
///
/// - `Added`: `created_at` and `updated_at` are set to now
/// - `Modified`: `updated_at` is set to now
#[derive(Clone)]
pub struct TimestampInterceptor {
    clock: Arc<dyn Clock>,
}

impl TimestampInterceptor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl<E: Timestamped> SaveInterceptor<E> for TimestampInterceptor {
    fn saving_changes(&self, entries: &mut [EntityEntry<'_, E>]) {
        let now = self.clock.now();

        for entry in entries.iter_mut() {
            match entry.state() {
                EntryState::Added => {
                    let entity = entry.entity_mut();
                    entity.set_created_at(now);
                    entity.set_updated_at(now);
                }
                EntryState::Modified => entry.entity_mut().set_updated_at(now),
                _ => {}
            }
        }
    }
}
