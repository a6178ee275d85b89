//! Health check support.
//!
//! Liveness, readiness and a full report for process supervisors.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::shutdown::ShutdownState;

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Point-in-time inputs gathered from the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthInputs {
    pub shutdown_state: ShutdownState,
    pub cache_entries: usize,
    pub cache_capacity: usize,
    pub tracked_callers: usize,
    pub active_connections: usize,
    pub max_connections: usize,
}

/// Detailed health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub state: HealthState,
    pub ready: bool,
    pub accepting_requests: bool,
    pub cache_entries: usize,
    pub cache_capacity: usize,
    pub tracked_callers: usize,
    pub active_connections: usize,
    pub uptime_secs: u64,
}

/// Aggregates health information from runtime components.
pub struct HealthChecker {
    start_time: Instant,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self { start_time: Instant::now() }
    }

    /// Process is responsive.
    pub fn is_alive(&self) -> bool {
        true
    }

    /// Accepting traffic and below the connection limit.
    pub fn is_ready(&self, inputs: &HealthInputs) -> bool {
        inputs.shutdown_state == ShutdownState::Running
            && inputs.active_connections < inputs.max_connections
    }

    pub fn report(&self, inputs: &HealthInputs) -> HealthReport {
        HealthReport {
            state: self.compute_state(inputs),
            ready: self.is_ready(inputs),
            accepting_requests: inputs.shutdown_state == ShutdownState::Running,
            cache_entries: inputs.cache_entries,
            cache_capacity: inputs.cache_capacity,
            tracked_callers: inputs.tracked_callers,
            active_connections: inputs.active_connections,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    fn compute_state(&self, inputs: &HealthInputs) -> HealthState {
        if inputs.shutdown_state != ShutdownState::Running {
            return HealthState::Unhealthy;
        }
        if inputs.active_connections >= inputs.max_connections {
            return HealthState::Degraded;
        }
        HealthState::Healthy
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}
