//! Telemetry module tests.

use std::path::PathBuf;

use querygate::telemetry::{
    log_security_event, record_admission_rejected, record_cache_entries, record_cache_evictions,
    record_cache_hit, record_cache_miss, LogConfig, LogError, LogFormat, RequestSpan,
    SecurityEvent, SecuritySeverity, SpanExt,
};
use tracing::Span;

// =============================================================================
// LogConfig Tests
// =============================================================================

#[test]
fn log_config_default_is_json() {
    let config = LogConfig::default();
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, "info");
    assert!(config.output_path.is_none());
}

#[test]
fn log_config_with_output_path() {
    let config = LogConfig {
        format: LogFormat::Json,
        level: "trace".to_string(),
        output_path: Some(PathBuf::from("/tmp/querygate-test.log")),
    };
    assert_eq!(config.output_path, Some(PathBuf::from("/tmp/querygate-test.log")));
}

#[test]
fn log_format_parses_aliases() {
    assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
    assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
}

// =============================================================================
// LogError Tests
// =============================================================================

#[test]
fn log_error_display() {
    let error = LogError::InvalidFilter("bad filter".to_string());
    assert!(error.to_string().contains("bad filter"));
    assert!(LogError::AlreadyInitialized
        .to_string()
        .contains("already initialized"));
}

// =============================================================================
// Security Events
// =============================================================================

#[test]
fn security_event_severities() {
    assert_eq!(SecurityEvent::InternalFault.severity(), SecuritySeverity::Critical);
    assert_eq!(SecurityEvent::RateLimited.as_str(), "rate_limited");
    assert_eq!(SecurityEvent::ContentBlocked.as_str(), "content_blocked");
}

#[test]
fn security_log_without_subscriber_is_noop() {
    log_security_event(SecurityEvent::RateLimited, "test", &[("user", "alice")]);
    querygate::security_log!(SecurityEvent::OutputSanitized, "escaped");
    querygate::security_log!(SecurityEvent::ContentBlocked, "blocked", "user" => "bob");
}

// =============================================================================
// Spans
// =============================================================================

#[test]
fn span_ext_record_result() {
    let span = Span::none();
    span.record_result::<i32, &str>(&Ok(42));
    span.record_result::<i32, &str>(&Err("test error"));
}

#[test]
fn request_spans_create_without_panic() {
    let query = RequestSpan::query(&RequestSpan::new_id());
    let secure = RequestSpan::secure(&RequestSpan::new_id(), "alice");
    let _g1 = query.enter();
    let _g2 = secure.enter();
}

// =============================================================================
// Metrics
// =============================================================================

#[test]
fn metrics_without_recorder_are_noops() {
    record_cache_hit();
    record_cache_miss();
    record_cache_evictions(2);
    record_cache_entries(5);
    record_admission_rejected("content_blocked");
}
