//! SaveInterceptor port - Hook invoked by a session right before it persists.

use super::EntryState;

/// A tracked entity as seen by an interceptor.
///
/// Interceptors may mutate the entity; the session writes the mutated value.
#[derive(Debug)]
pub struct EntityEntry<'a, E> {
    state: EntryState,
    entity: &'a mut E,
}

impl<'a, E> EntityEntry<'a, E> {
    pub fn new(state: EntryState, entity: &'a mut E) -> Self {
        Self { state, entity }
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn entity(&self) -> &E {
        &*self.entity
    }

    pub fn entity_mut(&mut self) -> &mut E {
        &mut *self.entity
    }
}

/// Port for pre-save hooks.
///
/// Sessions call every registered interceptor, in registration order, with
/// all tracked entries before writing. Interceptors run synchronously and
/// cannot fail the save.
pub trait SaveInterceptor<E>: Send + Sync {
    fn saving_changes(&self, entries: &mut [EntityEntry<'_, E>]);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Uppercase;

    impl SaveInterceptor<String> for Uppercase {
        fn saving_changes(&self, entries: &mut [EntityEntry<'_, String>]) {
            for entry in entries.iter_mut() {
                if entry.state() == EntryState::Added {
                    let upper = entry.entity().to_uppercase();
                    *entry.entity_mut() = upper;
                }
            }
        }
    }

    #[test]
    fn interceptor_mutates_entries_in_place() {
        let mut added = "new".to_string();
        let mut unchanged = "old".to_string();
        let mut entries = vec![
            EntityEntry::new(EntryState::Added, &mut added),
            EntityEntry::new(EntryState::Unchanged, &mut unchanged),
        ];

        Uppercase.saving_changes(&mut entries);
        drop(entries);

        assert_eq!(added, "NEW");
        assert_eq!(unchanged, "old");
    }

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn SaveInterceptor<String>) {}
}
