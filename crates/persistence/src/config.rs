//! Configuration types for the ingestion engine.
//!
//! All configuration is immutable once a pipeline is built. Each struct can be
//! deserialized with serde (missing fields fall back to defaults) and checked
//! with `validate()`, which returns every problem found rather than the first.
//!
//! # Example
//!
//! ```
//! use strata_persistence::config::{PipelineConfig, PlacementThresholds};
//!
//! let config = PipelineConfig {
//!     thresholds: PlacementThresholds {
//!         frequency_threshold: 70.0,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Thresholds that drive the placement decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementThresholds {
    /// Minimum frequency (percent of records) for relational placement.
    #[serde(default = "default_frequency_threshold")]
    pub frequency_threshold: f64,

    /// Minimum type stability (percent) for relational placement.
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: f64,

    /// Observations required before a field can leave the document default.
    #[serde(default = "default_min_observations")]
    pub min_observations: u64,
}

fn default_frequency_threshold() -> f64 {
    60.0
}

fn default_stability_threshold() -> f64 {
    80.0
}

fn default_min_observations() -> u64 {
    10
}

impl Default for PlacementThresholds {
    fn default() -> Self {
        Self {
            frequency_threshold: default_frequency_threshold(),
            stability_threshold: default_stability_threshold(),
            min_observations: default_min_observations(),
        }
    }
}

impl PlacementThresholds {
    /// Validates the thresholds.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if !(0.0..=100.0).contains(&self.frequency_threshold) {
            errors.push(format!(
                "frequency_threshold must be within 0..=100, got {}",
                self.frequency_threshold
            ));
        }
        if !(0.0..=100.0).contains(&self.stability_threshold) {
            errors.push(format!(
                "stability_threshold must be within 0..=100, got {}",
                self.stability_threshold
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Retry policy for backend writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    50
}

fn default_max_delay_ms() -> u64 {
    2_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Initial delay as a [`Duration`].
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Maximum delay as a [`Duration`].
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Returns the delay that follows `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        std::cmp::min(
            Duration::from_secs_f64(current.as_secs_f64() * self.backoff_multiplier),
            self.max_delay(),
        )
    }
}

/// Thresholds for marking the document backend unhealthy and recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Number of consecutive failed writes before marking unhealthy.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Number of consecutive successful probes before marking healthy again.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,

    /// While unhealthy, probe the backend every this many records.
    #[serde(default = "default_probe_every")]
    pub probe_every: u64,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_success_threshold() -> u32 {
    1
}

fn default_probe_every() -> u64 {
    100
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            probe_every: default_probe_every(),
        }
    }
}

/// Complete configuration for an ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Placement thresholds.
    #[serde(default)]
    pub thresholds: PlacementThresholds,

    /// Capacity of each field's sample reservoir.
    #[serde(default = "default_sample_capacity")]
    pub sample_capacity: usize,

    /// Persist metadata after this many accepted records (0 = only after
    /// batches and on shutdown).
    #[serde(default = "default_persist_every")]
    pub persist_every: u64,

    /// Retry policy for backend writes.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Document backend health policy.
    #[serde(default)]
    pub health: HealthConfig,
}

fn default_sample_capacity() -> usize {
    50
}

fn default_persist_every() -> u64 {
    10
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thresholds: PlacementThresholds::default(),
            sample_capacity: default_sample_capacity(),
            persist_every: default_persist_every(),
            retry: RetryConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validates the configuration and returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = match self.thresholds.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if self.sample_capacity < 2 {
            errors.push("sample_capacity must be at least 2".to_string());
        }

        if self.retry.backoff_multiplier < 1.0 {
            errors.push("retry.backoff_multiplier cannot be below 1.0".to_string());
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            errors.push("retry.initial_delay_ms cannot exceed retry.max_delay_ms".to_string());
        }

        if self.health.failure_threshold == 0 {
            errors.push("health.failure_threshold cannot be 0".to_string());
        }

        if self.health.success_threshold == 0 {
            errors.push("health.success_threshold cannot be 0".to_string());
        }

        if self.health.probe_every == 0 {
            errors.push("health.probe_every cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validates and converts failures into a [`ConfigError`].
    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|errors| ConfigError::Invalid { errors })
    }

    /// Creates a configuration suitable for testing: no retry delays and
    /// no periodic persistence.
    pub fn for_testing() -> Self {
        Self {
            persist_every: 0,
            retry: RetryConfig::none(),
            ..Default::default()
        }
    }
}
