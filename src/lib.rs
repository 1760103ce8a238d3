//! Tracked Repository - Generic repository and unit-of-work layer
//!
//! This crate layers a typed CRUD repository over a change-tracking
//! persistence session. Outcomes are reported as tri-state results
//! (`Success`, `PartialSuccess`, `Failure`) carrying descriptive errors,
//! while cancellation and misuse interrupt the caller as faults.
//!
//! # Example
//!
//! ```ignore
//! let session = Arc::new(
//!     InMemorySession::new(InMemoryDatabase::new())
//!         .with_interceptor(TimestampInterceptor::new(Arc::new(SystemClock))),
//! );
//! let repo = DatabaseRepository::<Customer, _>::new(session);
//!
//! let result = repo.create(customer, &cancel).await?;
//! if result.has_failed() {
//!     for error in result.errors() {
//!         tracing::warn!(%error, "create failed");
//!     }
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
