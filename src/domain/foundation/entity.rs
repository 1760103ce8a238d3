//! Capability contracts entities implement to take part in repositories.

use std::fmt::Debug;

use super::Timestamp;

/// An entity identified by a unique key.
pub trait UniqueEntity: Clone + Send + Sync + 'static {
    /// Primary key type. `Default` is the "not yet assigned" key.
    type Key: Clone + PartialEq + Default + Debug + Send + Sync + 'static;

    fn id(&self) -> &Self::Key;

    /// Short type name used in error descriptions and cache keys.
    fn entity_name() -> &'static str
    where
        Self: Sized,
    {
        short_type_name::<Self>()
    }
}

/// An entity carrying creation and last-update timestamps.
pub trait Timestamped {
    fn created_at(&self) -> Timestamp;
    fn set_created_at(&mut self, at: Timestamp);
    fn updated_at(&self) -> Timestamp;
    fn set_updated_at(&mut self, at: Timestamp);
}

/// Whether a read registers the returned entities with the session's tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tracking {
    /// The entity is tracked and can be updated through the same session.
    Tracked,

    /// A detached snapshot.
    #[default]
    Untracked,
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Widget {
        id: u32,
    }

    impl UniqueEntity for Widget {
        type Key = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    #[test]
    fn entity_name_is_short_type_name() {
        assert_eq!(Widget::entity_name(), "Widget");
    }

    #[test]
    fn default_tracking_is_untracked() {
        assert_eq!(Tracking::default(), Tracking::Untracked);
    }

    #[test]
    fn id_returns_key() {
        let widget = Widget { id: 9 };
        assert_eq!(*widget.id(), 9);
    }
}
