//! Tracing subscriber setup for host applications.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{GateError, Result};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` overrides `config.level` when set. Fails if a global subscriber
/// is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| GateError::Telemetry(format!("invalid log filter '{}': {}", config.level, e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| GateError::Telemetry(e.to_string()))
}
