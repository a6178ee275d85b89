//! Runtime wiring: health across shutdown, connection limits and the
//! maintenance sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use querygate::cache::CacheStoreConfig;
use querygate::gateway::{GatewayConfig, QueryRequest};
use querygate::health::HealthState;
use querygate::ipc::{
    ConnectionConfig, ConnectionPool, HealthCheckResponse, HealthCheckType, IpcMessage,
};
use querygate::{spawn_maintenance, Runtime, RuntimeConfig};

async fn health(rt: &Runtime, check_type: HealthCheckType) -> HealthCheckResponse {
    match rt
        .ipc_handler
        .handle_message(IpcMessage::HealthCheck { check_type })
        .await
    {
        IpcMessage::HealthResponse(r) => r,
        other => panic!("unexpected reply: {:?}", other),
    }
}

#[tokio::test]
async fn fresh_runtime_is_live_and_ready() {
    let rt = Runtime::new(RuntimeConfig::default()).unwrap();
    assert!(health(&rt, HealthCheckType::Liveness).await.ok);
    assert!(health(&rt, HealthCheckType::Readiness).await.ok);

    let full = health(&rt, HealthCheckType::Full).await;
    let report = full.report.unwrap();
    assert_eq!(report.state, HealthState::Healthy);
    assert!(report.accepting_requests);
    assert_eq!(report.cache_entries, 0);
    assert_eq!(report.tracked_callers, 0);
}

#[tokio::test]
async fn draining_runtime_refuses_work_but_answers_probes() {
    let rt = Runtime::new(RuntimeConfig::default()).unwrap();
    let result = rt.shutdown.initiate(Duration::from_millis(50)).await;
    assert_eq!(result, querygate::shutdown::ShutdownResult::Complete);

    let reply = rt
        .ipc_handler
        .handle_message(IpcMessage::QueryRequest(QueryRequest::new("late")))
        .await;
    assert!(matches!(reply, IpcMessage::Error { code: 503, .. }));

    let live = rt
        .ipc_handler
        .handle_message(IpcMessage::HealthCheck {
            check_type: HealthCheckType::Liveness,
        })
        .await;
    assert!(matches!(live, IpcMessage::HealthResponse(ref r) if r.ok));

    let full = rt
        .ipc_handler
        .handle_message(IpcMessage::HealthCheck {
            check_type: HealthCheckType::Full,
        })
        .await;
    match full {
        IpcMessage::HealthResponse(r) => {
            assert!(!r.ok);
            assert_eq!(r.report.unwrap().state, HealthState::Unhealthy);
        }
        other => panic!("unexpected reply: {:?}", other),
    }
}

#[tokio::test]
async fn saturated_pool_degrades_readiness() {
    let config = RuntimeConfig {
        connections: ConnectionConfig { max_connections: 1 },
        ..RuntimeConfig::default()
    };
    let rt = Runtime::new(config).unwrap();
    let _slot = rt.connections.try_acquire().unwrap();

    let reply = rt
        .ipc_handler
        .handle_message(IpcMessage::HealthCheck {
            check_type: HealthCheckType::Full,
        })
        .await;
    match reply {
        IpcMessage::HealthResponse(r) => {
            assert!(!r.ok);
            let report = r.report.unwrap();
            assert_eq!(report.state, HealthState::Degraded);
            assert_eq!(report.active_connections, 1);
        }
        other => panic!("unexpected reply: {:?}", other),
    }
}

#[test]
fn borrowed_guard_releases_slot() {
    let pool = ConnectionPool::new(ConnectionConfig { max_connections: 1 });
    {
        let _g = pool.try_acquire().unwrap();
        assert!(pool.try_acquire().is_none());
    }
    assert_eq!(pool.active_count(), 0);
    assert!(pool.try_acquire().is_some());
}

#[tokio::test]
async fn maintenance_sweeps_expired_entries() {
    let config = RuntimeConfig {
        gateway: GatewayConfig {
            cache: CacheStoreConfig {
                capacity: 10,
                ttl: Duration::from_millis(20),
            },
            ..GatewayConfig::default()
        },
        ..RuntimeConfig::default()
    };
    let rt = Runtime::new(config).unwrap();
    rt.gateway.query(QueryRequest::new("stale")).await.unwrap();
    assert_eq!(rt.gateway.cache().len(), 1);

    let cancel = CancellationToken::new();
    let task = spawn_maintenance(
        Arc::clone(&rt.gateway),
        Duration::from_millis(30),
        cancel.clone(),
    );
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(rt.gateway.cache().is_empty());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("maintenance task should stop")
        .unwrap();
}
