//! Tracing subscriber setup.
//!
//! Repositories emit `tracing` events; applications embedding the crate
//! usually install their own subscriber. [`init_tracing`] is provided for
//! binaries and tests that want the default output.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::config::{LoggingConfig, ValidationError};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error(transparent)]
    InvalidFilter(#[from] ValidationError),

    #[error("Failed to install tracing subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Installs a global fmt subscriber filtered by `RUST_LOG` or the configured level.
///
/// # Errors
///
/// - `InvalidFilter` when the configured level does not parse
/// - `Install` when a global subscriber is already set
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let registry = tracing_subscriber::registry().with(config.env_filter()?);

    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }
    Ok(())
}
