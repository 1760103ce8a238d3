//! Ports - Interfaces for external collaborators.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the repository core and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `Session` - Change-tracking unit of work over one entity type
//! - `SaveInterceptor` - Hook run by a session right before it persists
//!
//! ## Infrastructure Ports
//!
//! - `Clock` - Source of the current time
//! - `Cache` - In-process cache with size and priority hints

mod cache;
mod clock;
mod save_interceptor;
mod session;

pub use cache::{Cache, CacheEntryOptions, CachePriority};
pub use clock::Clock;
pub use save_interceptor::{EntityEntry, SaveInterceptor};
pub use session::{EntryState, Session, SessionError};
