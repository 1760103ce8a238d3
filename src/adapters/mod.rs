//! Adapters - Implementations of the port interfaces.
//!
//! - `memory`: in-memory database and change-tracking session
//! - `cache`: in-process cache
//! - `clock`: system and manual clocks

pub mod cache;
pub mod clock;
pub mod memory;

pub use cache::MemoryCache;
pub use clock::{ManualClock, SystemClock};
pub use memory::{InMemoryDatabase, InMemorySession};
