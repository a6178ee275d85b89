//! querygate
//!
//! A caching query front-end with an admission gate. Queries are normalized
//! and fingerprinted; answers are kept in a bounded LRU store with TTL
//! expiry. The admission path rate-limits each caller, screens input
//! against a data-driven rule table and escapes markup in answers.
//!
//! # Design Principles
//!
//! - **Fail-closed**: any fault in the admission path refuses the request
//! - **Bounded**: cache size, per-caller windows and frame sizes are capped
//! - **Local**: IPC over Unix sockets or named pipes only, no HTTP listener
//!
//! # Layout
//!
//! - [`cache`]: normalizer, LRU/TTL store, hit/miss statistics
//! - [`security`]: rate limiter, rule filter, admission gate, output escaping
//! - [`gateway`]: the request orchestrator shared by every connection
//! - [`ipc`]: framing, message schema, server loop and client

pub mod cache;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod health;
pub mod ipc;
pub mod security;
pub mod shutdown;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use gateway::{AnswerProducer, GatewayConfig, QueryGateway, SimulatedProducer};
use ipc::{ConnectionConfig, ConnectionPool, IpcHandler, IpcServerConfig};
use security::RuleError;
use shutdown::ShutdownCoordinator;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub gateway: GatewayConfig,
    pub connections: ConnectionConfig,
    pub ipc_server: IpcServerConfig,
    pub shutdown_timeout: Duration,
    /// Period of the expiry sweep.
    pub maintenance_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            connections: ConnectionConfig::default(),
            ipc_server: IpcServerConfig::default(),
            shutdown_timeout: Duration::from_secs(30),
            maintenance_interval: Duration::from_secs(60),
        }
    }
}

/// The querygate runtime instance.
pub struct Runtime {
    pub config: RuntimeConfig,
    pub gateway: Arc<QueryGateway>,
    pub connections: Arc<ConnectionPool>,
    pub shutdown: ShutdownCoordinator,
    pub ipc_handler: IpcHandler,
}

impl Runtime {
    /// Runtime backed by the simulated answer producer.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuleError> {
        Self::with_producer(config, Arc::new(SimulatedProducer))
    }

    pub fn with_producer(
        config: RuntimeConfig,
        producer: Arc<dyn AnswerProducer>,
    ) -> Result<Self, RuleError> {
        let gateway = Arc::new(QueryGateway::new(config.gateway.clone(), producer)?);
        let connections = Arc::new(ConnectionPool::new(config.connections.clone()));
        let shutdown = ShutdownCoordinator::new();
        let ipc_handler = IpcHandler::new(
            Arc::clone(&gateway),
            Arc::clone(&connections),
            shutdown.clone(),
        );

        Ok(Self {
            config,
            gateway,
            connections,
            shutdown,
            ipc_handler,
        })
    }
}

/// Sweep expired cache entries and idle rate windows every `interval`
/// until `cancel` fires.
pub fn spawn_maintenance(
    gateway: Arc<QueryGateway>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let report = gateway.maintain();
                    if report.expired_entries > 0 || report.idle_identities > 0 {
                        tracing::debug!(
                            expired = report.expired_entries,
                            idle = report.idle_identities,
                            "maintenance sweep"
                        );
                    }
                }
            }
        }
    })
}
