//! Request orchestration.
//!
//! `QueryGateway` owns the cache, the stats and the admission gate and is
//! shared across connections behind an `Arc`. Two entry points:
//!
//! - `query`: normalize -> fingerprint -> cache -> (miss) produce -> store
//! - `secure`: admission gate -> produce -> escape markup
//!
//! `query_as` runs a query through the gate first.

mod producer;

pub use producer::{AnswerProducer, SimulatedProducer};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

use crate::cache::{
    normalize, AnalyticsSnapshot, CacheStats, CacheStore, CacheStoreConfig, Fingerprint,
};
use crate::security::{
    AdmissionGate, AdmissionVerdict, OutputSanitizer, Rejection, RuleError, SecurityConfig,
};
use crate::security_log;
use crate::telemetry::{
    record_cache_entries, record_cache_evictions, record_cache_hit, record_cache_miss,
    RequestSpan, SecurityEvent, SpanExt,
};

/// Nominal latency reported for a cache hit, in milliseconds.
pub const CACHED_LATENCY_MS: u64 = 20;
/// Nominal latency reported for a produced answer, in milliseconds.
pub const PRODUCED_LATENCY_MS: u64 = 500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Request rejected: {}", .0.reason())]
    Rejected(Rejection),
}

impl GatewayError {
    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingField(_) => 400,
            Self::Rejected(r) => r.status_code(),
        }
    }
}

/// Query request. `query` is optional on the wire so that a missing field
/// is reported as a malformed request rather than a decode failure.
/// With `userId` set the query goes through the admission gate first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Query response. Field names match the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub answer: String,
    pub cached: bool,
    /// Nominal latency in milliseconds.
    pub latency: u64,
    /// First 8 hex characters of the fingerprint.
    pub cache_key: String,
}

/// Admission-gated request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
}

impl SecureRequest {
    pub fn new(user_id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            input: Some(input.into()),
        }
    }
}

/// Verdict plus the status code to report it with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecureOutcome {
    pub status: u16,
    pub verdict: AdmissionVerdict,
}

impl SecureOutcome {
    fn rejected(rejection: &Rejection) -> Self {
        Self {
            status: rejection.status_code(),
            verdict: rejection.verdict(),
        }
    }
}

/// Result of one maintenance sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired_entries: usize,
    pub idle_identities: usize,
}

/// Gateway configuration.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub cache: CacheStoreConfig,
    pub security: SecurityConfig,
}

/// Process-scoped service object shared by every connection.
pub struct QueryGateway {
    cache: CacheStore,
    stats: CacheStats,
    gate: AdmissionGate,
    sanitizer: OutputSanitizer,
    producer: Arc<dyn AnswerProducer>,
}

impl QueryGateway {
    pub fn new(config: GatewayConfig, producer: Arc<dyn AnswerProducer>) -> Result<Self, RuleError> {
        Ok(Self {
            cache: CacheStore::new(config.cache),
            stats: CacheStats::new(),
            gate: AdmissionGate::new(&config.security)?,
            sanitizer: OutputSanitizer::new(config.security.max_output_length),
            producer,
        })
    }

    /// Gateway with default limits and the simulated producer.
    pub fn with_defaults() -> Self {
        Self {
            cache: CacheStore::default(),
            stats: CacheStats::new(),
            gate: AdmissionGate::default(),
            sanitizer: OutputSanitizer::default(),
            producer: Arc::new(SimulatedProducer),
        }
    }

    /// Answer a query from the cache or the producer.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse, GatewayError> {
        let request_id = RequestSpan::new_id();
        let span = RequestSpan::query(&request_id);
        let result = self.query_inner(request).instrument(span.clone()).await;
        span.record_result(&result);
        result
    }

    /// Run the admission gate for `identity`, then answer the query.
    pub async fn query_as(
        &self,
        identity: &str,
        request: QueryRequest,
    ) -> Result<QueryResponse, GatewayError> {
        let text = request
            .query
            .as_deref()
            .ok_or(GatewayError::MissingField("query"))?;
        self.gate
            .admit_query(identity, text)
            .map_err(GatewayError::Rejected)?;
        self.query(request).await
    }

    async fn query_inner(&self, request: QueryRequest) -> Result<QueryResponse, GatewayError> {
        let query = request.query.ok_or(GatewayError::MissingField("query"))?;
        let canonical = normalize(&query);
        let key = Fingerprint::of_normalized(&canonical);
        let cache_key = key.display_key();
        let span = tracing::Span::current();
        span.record("cache_key", cache_key.as_str());

        if let Some(entry) = self.cache.get(&key) {
            self.stats.record_hit();
            record_cache_hit();
            span.record("cached", true);
            tracing::debug!(cache_key = %cache_key, "cache hit");
            return Ok(QueryResponse {
                answer: entry.answer().to_string(),
                cached: true,
                latency: CACHED_LATENCY_MS,
                cache_key,
            });
        }

        let answer = self.producer.produce(&canonical).await;
        let evicted = self.cache.put(key, answer.clone());
        self.stats.record_miss();
        record_cache_miss();
        record_cache_evictions(evicted);
        record_cache_entries(self.cache.len());
        span.record("cached", false);
        tracing::debug!(
            cache_key = %cache_key,
            producer = self.producer.name(),
            evicted,
            "cache miss, answer stored"
        );

        Ok(QueryResponse {
            answer,
            cached: false,
            latency: PRODUCED_LATENCY_MS,
            cache_key,
        })
    }

    /// Admission-gated answer with markup escaped.
    pub async fn secure(&self, request: SecureRequest) -> SecureOutcome {
        let user_id = request.user_id.unwrap_or_default();
        let input = request.input.unwrap_or_default();
        let span = RequestSpan::secure(&RequestSpan::new_id(), &user_id);

        async {
            if let Err(rejection) = self.gate.admit(&user_id, &input) {
                tracing::Span::current().record("blocked", true);
                return SecureOutcome::rejected(&rejection);
            }

            let answer = self.producer.produce(&normalize(&input)).await;
            let sanitized = self.sanitizer.sanitize(&answer);
            if sanitized.modified {
                security_log!(
                    SecurityEvent::OutputSanitized,
                    "Escaped markup in answer",
                    "user" => user_id.as_str()
                );
            }
            tracing::Span::current().record("blocked", false);

            SecureOutcome {
                status: 200,
                verdict: AdmissionVerdict::allowed(sanitized.output),
            }
        }
        .instrument(span)
        .await
    }

    /// Current analytics.
    pub fn analytics(&self) -> AnalyticsSnapshot {
        self.stats.snapshot(self.cache.len())
    }

    /// Purge expired cache entries and idle rate windows.
    pub fn maintain(&self) -> MaintenanceReport {
        let report = MaintenanceReport {
            expired_entries: self.cache.purge_expired(),
            idle_identities: self.gate.limiter().purge_idle(),
        };
        record_cache_entries(self.cache.len());
        report
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }
}
