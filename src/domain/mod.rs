//! Domain layer containing the repository vocabulary.
//!
//! # Module Organization
//!
//! - `foundation` - Result algebra, errors, keys, entity contracts and repository traits

pub mod foundation;
