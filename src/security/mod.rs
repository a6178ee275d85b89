//! Security module for querygate
//!
//! This module provides the admission gate in front of answer production:
//! - Per-caller sliding-window rate limiting
//! - Data-driven prompt injection rules
//! - Output markup escaping
//! - Fail-closed verdicts

mod gate;
pub mod output_sanitizer;
pub mod prompt_injection;
pub mod rate_limiter;
pub mod rules;

pub use gate::AdmissionGate;
pub use output_sanitizer::{escape_markup, OutputSanitizer, SanitizationResult};
pub use prompt_injection::{InjectionMatch, PromptInjectionFilter};
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use rules::{InjectionRule, RuleError, RuleKind, RuleTable};

use serde::{Deserialize, Serialize};

/// Confidence reported with an admitted request.
pub const CONFIDENCE_ALLOWED: f32 = 0.95;
/// Confidence reported when a rule blocks the input.
pub const CONFIDENCE_CONTENT_BLOCKED: f32 = 0.98;
/// Confidence reported when the caller is rate limited.
pub const CONFIDENCE_RATE_LIMITED: f32 = 0.99;
/// Confidence for malformed requests and internal faults.
pub const CONFIDENCE_CERTAIN: f32 = 1.0;

/// Security configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub rate_limit: RateLimitConfig,
    /// Ordered admission rules
    pub rules: RuleTable,
    /// Maximum sanitized output length in bytes
    pub max_output_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            rules: RuleTable::default(),
            max_output_length: 100_000,
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A required field was missing or empty.
    Malformed(&'static str),
    /// Caller exceeded the request window.
    RateLimited,
    /// Input matched an admission rule.
    ContentBlocked(InjectionMatch),
    /// Unexpected failure while checking.
    InternalFault,
}

impl Rejection {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::RateLimited => "rate_limited",
            Self::ContentBlocked(_) => "content_blocked",
            Self::InternalFault => "internal_fault",
        }
    }

    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Malformed(_) | Self::ContentBlocked(_) => 400,
            Self::RateLimited => 429,
            Self::InternalFault => 500,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Self::Malformed(_) | Self::InternalFault => CONFIDENCE_CERTAIN,
            Self::RateLimited => CONFIDENCE_RATE_LIMITED,
            Self::ContentBlocked(_) => CONFIDENCE_CONTENT_BLOCKED,
        }
    }

    /// Caller-facing reason. Internal faults never carry detail.
    pub fn reason(&self) -> String {
        match self {
            Self::Malformed(field) => format!("Malformed request: missing field '{}'", field),
            Self::RateLimited => "Too many requests. Please slow down.".to_string(),
            Self::ContentBlocked(m) => m.reason.clone(),
            Self::InternalFault => "Request could not be processed safely".to_string(),
        }
    }

    pub fn verdict(&self) -> AdmissionVerdict {
        AdmissionVerdict {
            blocked: true,
            reason: self.reason(),
            confidence: self.confidence(),
            sanitized_output: None,
        }
    }
}

/// Per-request gate decision. Field names match the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionVerdict {
    pub blocked: bool,
    pub reason: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitized_output: Option<String>,
}

impl AdmissionVerdict {
    /// Verdict for an admitted request carrying its sanitized answer.
    pub fn allowed(sanitized_output: String) -> Self {
        Self {
            blocked: false,
            reason: "Input passed security checks".to_string(),
            confidence: CONFIDENCE_ALLOWED,
            sanitized_output: Some(sanitized_output),
        }
    }
}
