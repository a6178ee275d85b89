//! Span utilities and extension traits.

use tracing::{info_span, Span};
use uuid::Uuid;

/// Extension trait for adding context to spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for standardized request spans.
pub struct RequestSpan;

impl RequestSpan {
    /// Fresh request identifier.
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Span for the cached query path.
    ///
    /// `cached` and `cache_key` are filled in once the lookup resolves.
    pub fn query(request_id: &str) -> Span {
        info_span!(
            "query_request",
            request_id = %request_id,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
            cached = tracing::field::Empty,
            cache_key = tracing::field::Empty,
        )
    }

    /// Span for the admission-gated path.
    pub fn secure(request_id: &str, user_id: &str) -> Span {
        info_span!(
            "secure_request",
            request_id = %request_id,
            user_id = %user_id,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
            blocked = tracing::field::Empty,
        )
    }
}
