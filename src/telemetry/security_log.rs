//! Security audit logging.
//!
//! Every admission rejection produces one structured audit line so that abuse
//! can be traced per caller without logging raw inputs.

use std::time::{SystemTime, UNIX_EPOCH};

/// Security event types for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    /// Caller exceeded its request window.
    RateLimited,
    /// Input matched an admission rule.
    ContentBlocked,
    /// Request missing a required field.
    MalformedRequest,
    /// Admission check failed internally; request refused.
    InternalFault,
    /// Answer contained markup that was escaped.
    OutputSanitized,
    /// Connection refused at the transport limit.
    ConnectionRejected,
    /// Oversized or undecodable frame.
    InvalidFrame,
}

impl SecurityEvent {
    pub fn severity(&self) -> SecuritySeverity {
        match self {
            Self::RateLimited => SecuritySeverity::Warning,
            Self::ContentBlocked => SecuritySeverity::Warning,
            Self::MalformedRequest => SecuritySeverity::Info,
            Self::InternalFault => SecuritySeverity::Critical,
            Self::OutputSanitized => SecuritySeverity::Debug,
            Self::ConnectionRejected => SecuritySeverity::Warning,
            Self::InvalidFrame => SecuritySeverity::Warning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::ContentBlocked => "content_blocked",
            Self::MalformedRequest => "malformed_request",
            Self::InternalFault => "internal_fault",
            Self::OutputSanitized => "output_sanitized",
            Self::ConnectionRejected => "connection_rejected",
            Self::InvalidFrame => "invalid_frame",
        }
    }
}

/// Severity levels for security events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecuritySeverity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl SecuritySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Format one audit line.
fn format_event(timestamp: u64, event: SecurityEvent, message: &str, details: &[(&str, &str)]) -> String {
    let mut line = format!(
        "[{}] SECURITY {} {}: {}",
        timestamp,
        event.severity().as_str(),
        event.as_str(),
        message
    );

    if !details.is_empty() {
        let details_str = details
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        line.push_str(" | ");
        line.push_str(&details_str);
    }
    line
}

/// Log a security event with structured details.
///
/// # Example
/// ```
/// use querygate::telemetry::{log_security_event, SecurityEvent};
///
/// log_security_event(
///     SecurityEvent::RateLimited,
///     "Caller exceeded request window",
///     &[("user", "alice")]
/// );
/// ```
pub fn log_security_event(event: SecurityEvent, message: &str, details: &[(&str, &str)]) {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let line = format_event(timestamp, event, message, details);

    match event.severity() {
        SecuritySeverity::Debug => tracing::debug!(event = event.as_str(), "{}", line),
        SecuritySeverity::Info => tracing::info!(event = event.as_str(), "{}", line),
        SecuritySeverity::Warning => tracing::warn!(event = event.as_str(), "{}", line),
        SecuritySeverity::Error | SecuritySeverity::Critical => {
            tracing::error!(event = event.as_str(), "{}", line)
        }
    }
}

/// Convenience macro for logging security events.
#[macro_export]
macro_rules! security_log {
    ($event:expr, $message:expr) => {
        $crate::telemetry::security_log::log_security_event($event, $message, &[])
    };
    ($event:expr, $message:expr, $($key:expr => $value:expr),+) => {
        $crate::telemetry::security_log::log_security_event(
            $event,
            $message,
            &[$(($key, $value)),+]
        )
    };
}
