//! Connection pool management with limits.
//!
//! Bounds concurrent client connections with RAII guards. The owned guard
//! moves into the per-connection task.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Configuration for connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub max_connections: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { max_connections: 64 }
    }
}

/// Global connection pool with atomic counting.
#[derive(Debug)]
pub struct ConnectionPool {
    active: AtomicUsize,
    config: ConnectionConfig,
}

impl ConnectionPool {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            active: AtomicUsize::new(0),
            config,
        }
    }

    /// Try to acquire a connection slot. Returns guard if available.
    pub fn try_acquire(&self) -> Option<ConnectionGuard<'_>> {
        self.reserve().then_some(ConnectionGuard { pool: self })
    }

    /// Like `try_acquire`, but the guard keeps the pool alive.
    pub fn try_acquire_owned(self: &Arc<Self>) -> Option<OwnedConnectionGuard> {
        self.reserve().then(|| OwnedConnectionGuard {
            pool: Arc::clone(self),
        })
    }

    /// Current number of active connections.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Maximum allowed connections.
    pub fn max_connections(&self) -> usize {
        self.config.max_connections
    }

    fn reserve(&self) -> bool {
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::Relaxed, |current| {
                (current < self.config.max_connections).then_some(current + 1)
            })
            .is_ok()
    }

    fn release(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard that releases connection on drop.
#[derive(Debug)]
pub struct ConnectionGuard<'a> {
    pool: &'a ConnectionPool,
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.pool.release();
    }
}

/// Owned variant of [`ConnectionGuard`] for spawned tasks.
#[derive(Debug)]
pub struct OwnedConnectionGuard {
    pool: Arc<ConnectionPool>,
}

impl Drop for OwnedConnectionGuard {
    fn drop(&mut self) {
        self.pool.release();
    }
}
