//! Error types for Gatekeeper.

use thiserror::Error;

/// Main error type for Gatekeeper operations.
///
/// None of these can occur while checking a request; they only come up while
/// loading configuration or installing the tracing subscriber.
#[derive(Error, Debug)]
pub enum GateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Telemetry initialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for GateError {
    fn from(err: config::ConfigError) -> Self {
        GateError::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for GateError {
    fn from(err: serde_yaml::Error) -> Self {
        GateError::Config(err.to_string())
    }
}

/// Result type alias for Gatekeeper operations.
pub type Result<T> = std::result::Result<T, GateError>;

/// A request was rejected because it arrived inside its operation's window.
///
/// This is an expected outcome, not a fault.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("rate limited: retry in {remaining_secs}s (window {window_secs}s)")]
pub struct RateLimited {
    /// Whole seconds until the window anchored at the last admission expires
    pub remaining_secs: u64,
    /// The window length applied to the operation
    pub window_secs: f64,
}
