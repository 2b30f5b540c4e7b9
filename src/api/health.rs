//! Shared counters for the /health endpoint.
//! Updated by the generate handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Process-local request outcomes. Reset on restart.
pub struct HealthState {
    started_at: Instant,
    /// Successful generate calls (one persisted row each).
    pub signals_generated: AtomicU64,
    /// Generate calls rejected with 400.
    pub validation_failures: AtomicU64,
    /// Generate calls that ended in 500.
    pub internal_failures: AtomicU64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    /// Rows in the signals table; null if the count query failed.
    pub stored_signals: Option<i64>,
    pub signals_generated: u64,
    pub validation_failures: u64,
    pub internal_failures: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            signals_generated: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            internal_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_generated(&self) {
        self.signals_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_validation_failures(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_internal_failures(&self) {
        self.internal_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, stored_signals: Option<i64>) -> HealthResponse {
        HealthResponse {
            status: "ok",
            uptime_secs: self.started_at.elapsed().as_secs(),
            stored_signals,
            signals_generated: self.signals_generated.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            internal_failures: self.internal_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}
