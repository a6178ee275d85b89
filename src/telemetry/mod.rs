//! Telemetry module for querygate.
//!
//! Provides structured logging, request spans, security audit events and
//! metrics facade counters. Nothing here opens a network listener.

mod logging;
mod metrics;
pub mod security_log;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use metrics::{
    record_admission_rejected, record_cache_entries, record_cache_evictions, record_cache_hit,
    record_cache_miss,
};
pub use security_log::{log_security_event, SecurityEvent, SecuritySeverity};
pub use spans::{RequestSpan, SpanExt};
