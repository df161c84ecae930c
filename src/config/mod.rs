//! # Pipeline Configuration System
//!
//! Layered configuration for the pipeline runtime: built-in defaults, an
//! optional configuration file, then `PIPELINE__`-prefixed environment
//! variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use interactive_pipeline::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//!
//! let poll = manager.config().input.poll_interval();
//! let capacity = manager.config().events.channel_capacity;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input gate and control surface timing
    pub input: InputConfig,

    /// Notification channel settings
    pub events: EventsConfig,

    /// Launch defaults and placeholder workload tuning
    pub pipeline: RunConfig,
}

/// Input gate configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub poll_interval_ms: u64,
    pub default_timeout_seconds: u64,
    pub submitted_value_ttl_seconds: u64,
    pub cancellation_ttl_seconds: u64,
    pub text_default: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: constants::INPUT_POLL_INTERVAL.as_millis() as u64,
            default_timeout_seconds: constants::DEFAULT_INPUT_TIMEOUT_SECONDS,
            submitted_value_ttl_seconds: constants::SUBMITTED_INPUT_TTL_SECONDS,
            cancellation_ttl_seconds: constants::CANCELLATION_TTL_SECONDS,
            text_default: constants::DEFAULT_TEXT_VALUE.to_string(),
        }
    }
}

impl InputConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Notification channel configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: constants::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Run-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Used when a launch request omits `data_size`
    pub default_data_size: u64,

    /// Multiplier applied to every placeholder delay; 0 disables them
    pub step_delay_scale: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            default_data_size: 100,
            step_delay_scale: 1.0,
        }
    }
}

impl PipelineConfig {
    /// Reject values that would stall or break the runtime
    pub fn validate(&self) -> ConfigResult<()> {
        if self.input.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "input.poll_interval_ms",
                "0",
                "poll interval must be positive",
            ));
        }
        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                "0",
                "broadcast capacity must be positive",
            ));
        }
        let scale = self.pipeline.step_delay_scale;
        if !(0.0..=constants::MAX_STEP_DELAY_SCALE).contains(&scale) {
            return Err(ConfigurationError::invalid_value(
                "pipeline.step_delay_scale",
                scale.to_string(),
                format!(
                    "delay scale must be a finite number between 0 and {}",
                    constants::MAX_STEP_DELAY_SCALE
                ),
            ));
        }
        Ok(())
    }
}
