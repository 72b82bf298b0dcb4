//! Health tracking for the optional document backend.
//!
//! Write outcomes feed a [`BackendHealth`] record. After
//! `failure_threshold` consecutive failures the backend is marked unhealthy
//! and the writer stops sending it documents; periodic probes that succeed
//! `success_threshold` times in a row bring it back.

use std::time::Instant;

use tracing::{info, warn};

use crate::config::HealthConfig;

/// Health status for a single backend.
#[derive(Debug, Clone)]
pub struct BackendHealth {
    /// Backend identifier.
    pub backend_id: String,

    /// Whether the backend is currently healthy.
    pub is_healthy: bool,

    /// Last successful operation.
    pub last_success: Option<Instant>,

    /// Last failed operation.
    pub last_failure: Option<Instant>,

    /// Consecutive failure count.
    pub consecutive_failures: u32,

    /// Consecutive success count.
    pub consecutive_successes: u32,

    /// Last error message (if any).
    pub last_error: Option<String>,

    config: HealthConfig,
}

impl BackendHealth {
    /// Creates a healthy status for a backend.
    pub fn new(backend_id: impl Into<String>, config: HealthConfig) -> Self {
        Self {
            backend_id: backend_id.into(),
            is_healthy: true,
            last_success: None,
            last_failure: None,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_error: None,
            config,
        }
    }

    /// Records a successful operation.
    pub fn record_success(&mut self) {
        self.last_success = Some(Instant::now());
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;
        self.last_error = None;
        self.update_health();
    }

    /// Records a failed operation.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.last_failure = Some(Instant::now());
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
        self.last_error = Some(error.into());
        self.update_health();
    }

    fn update_health(&mut self) {
        if self.consecutive_failures >= self.config.failure_threshold {
            if self.is_healthy {
                warn!(
                    backend = %self.backend_id,
                    failures = self.consecutive_failures,
                    error = self.last_error.as_deref().unwrap_or(""),
                    "Backend marked unhealthy, continuing relational-only"
                );
            }
            self.is_healthy = false;
        } else if self.consecutive_successes >= self.config.success_threshold {
            if !self.is_healthy {
                info!(
                    backend = %self.backend_id,
                    successes = self.consecutive_successes,
                    "Backend recovered"
                );
            }
            self.is_healthy = true;
        }
    }
}
