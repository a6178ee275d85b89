//! Graceful shutdown coordination.
//!
//! Running -> Draining -> Stopped. New requests are refused once draining
//! starts; in-flight requests hold a guard and are waited for up to a
//! deadline.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Shutdown state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
    Stopped,
}

impl ShutdownState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Running,
            1 => Self::Draining,
            _ => Self::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Draining => 1,
            Self::Stopped => 2,
        }
    }
}

/// Result of a shutdown operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownResult {
    Complete,
    Timeout { remaining: usize },
}

#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    in_flight: AtomicUsize,
    drained: Notify,
}

/// Tracks in-flight requests and drains them on shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    shared: Arc<Shared>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: AtomicU8::new(ShutdownState::Running.as_u8()),
                in_flight: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    pub fn state(&self) -> ShutdownState {
        ShutdownState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    pub fn is_accepting(&self) -> bool {
        self.state() == ShutdownState::Running
    }

    /// Register an in-flight request. `None` once draining has started.
    pub fn track(&self) -> Option<InFlightGuard> {
        self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
        if !self.is_accepting() {
            self.release();
            return None;
        }
        Some(InFlightGuard { coordinator: self.clone() })
    }

    pub fn in_flight_count(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Stop accepting and wait up to `timeout` for in-flight requests.
    pub async fn initiate(&self, timeout: Duration) -> ShutdownResult {
        self.shared
            .state
            .store(ShutdownState::Draining.as_u8(), Ordering::SeqCst);
        tracing::info!(in_flight = self.in_flight_count(), "draining in-flight requests");

        let result = match tokio::time::timeout(timeout, self.wait_for_drain()).await {
            Ok(()) => ShutdownResult::Complete,
            Err(_) => ShutdownResult::Timeout {
                remaining: self.in_flight_count(),
            },
        };

        self.shared
            .state
            .store(ShutdownState::Stopped.as_u8(), Ordering::SeqCst);
        result
    }

    async fn wait_for_drain(&self) {
        loop {
            let notified = self.shared.drained.notified();
            if self.in_flight_count() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn release(&self) {
        if self.shared.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.shared.drained.notify_waiters();
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for one in-flight request.
#[derive(Debug)]
pub struct InFlightGuard {
    coordinator: ShutdownCoordinator,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.coordinator.release();
    }
}
