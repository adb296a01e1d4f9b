//! Configuration management for Gatekeeper.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{GateError, Result};
use crate::ratelimit::PolicyConfig;

/// Prefix for environment variable overrides, e.g.
/// `GATEKEEPER__LIMITER__RETENTION_SECS=120`.
const ENV_PREFIX: &str = "GATEKEEPER";

/// Main configuration for Gatekeeper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    /// Limiter state retention and sweeping
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Operation classification and per-class windows
    #[serde(default)]
    pub policies: PolicyConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Limiter state configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Records older than this many seconds are evicted
    #[serde(default = "default_retention")]
    pub retention_secs: f64,

    /// Seconds between sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl LimiterConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_retention() -> f64 {
    60.0
}

fn default_sweep_interval() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GatekeeperConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GatekeeperConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file layered under `GATEKEEPER__*`
    /// environment variables.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let config: GatekeeperConfig = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.limiter.retention_secs.is_finite() || self.limiter.retention_secs <= 0.0 {
            return Err(GateError::Config(format!(
                "limiter.retention_secs must be positive, got {}",
                self.limiter.retention_secs
            )));
        }
        if self.limiter.sweep_interval_secs == 0 {
            return Err(GateError::Config(
                "limiter.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
