//! Health check request handling.
//!
//! Probes bypass shutdown tracking so a draining server still answers them.

use std::sync::Arc;

use super::connections::ConnectionPool;
use super::protocol::{HealthCheckResponse, HealthCheckType};
use crate::gateway::QueryGateway;
use crate::health::{HealthChecker, HealthInputs};
use crate::shutdown::ShutdownCoordinator;

/// Gathers runtime state and answers health probes.
pub struct HealthHandler {
    health: HealthChecker,
    gateway: Arc<QueryGateway>,
    connections: Arc<ConnectionPool>,
    shutdown: ShutdownCoordinator,
}

impl HealthHandler {
    pub fn new(
        gateway: Arc<QueryGateway>,
        connections: Arc<ConnectionPool>,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        Self {
            health: HealthChecker::new(),
            gateway,
            connections,
            shutdown,
        }
    }

    pub fn handle(&self, check_type: HealthCheckType) -> HealthCheckResponse {
        match check_type {
            HealthCheckType::Liveness => HealthCheckResponse {
                check_type,
                ok: self.health.is_alive(),
                report: None,
            },
            HealthCheckType::Readiness => HealthCheckResponse {
                check_type,
                ok: self.health.is_ready(&self.inputs()),
                report: None,
            },
            HealthCheckType::Full => {
                let report = self.health.report(&self.inputs());
                HealthCheckResponse {
                    check_type,
                    ok: report.ready,
                    report: Some(report),
                }
            }
        }
    }

    fn inputs(&self) -> HealthInputs {
        HealthInputs {
            shutdown_state: self.shutdown.state(),
            cache_entries: self.gateway.cache().len(),
            cache_capacity: self.gateway.cache().capacity(),
            tracked_callers: self.gateway.gate().limiter().tracked_identities(),
            active_connections: self.connections.active_count(),
            max_connections: self.connections.max_connections(),
        }
    }
}
