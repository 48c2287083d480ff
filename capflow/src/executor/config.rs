//! Executor configuration.

use crate::errors::ConfigError;
use crate::platform::PlatformRequirement;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a `FallbackExecutor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Per-implementation timeout used when the caller supplies none.
    pub default_timeout_ms: u64,
    /// Platform the host must satisfy before any implementation runs.
    pub required_platform: Option<PlatformRequirement>,
    /// Whether to emit events to the configured sink.
    pub emit_events: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            required_platform: None,
            emit_events: true,
        }
    }
}

impl ExecutorConfig {
    /// Creates a new config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates a JSON config document. Missing fields take defaults.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the default per-implementation timeout.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the required platform.
    #[must_use]
    pub fn with_required_platform(mut self, requirement: PlatformRequirement) -> Self {
        self.required_platform = Some(requirement);
        self
    }

    /// Enables or disables event emission.
    #[must_use]
    pub fn with_events(mut self, enabled: bool) -> Self {
        self.emit_events = enabled;
        self
    }

    /// Returns the default timeout as a `Duration`.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Checks that every field holds a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "default_timeout_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
