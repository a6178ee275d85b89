//! Admission gate: request shape, rate limit, then content rules.
//!
//! Evaluation is fail-closed. A panic inside a check is caught and turned
//! into an internal-fault rejection rather than letting the input through.

use std::panic::{catch_unwind, AssertUnwindSafe};

use super::prompt_injection::PromptInjectionFilter;
use super::rate_limiter::RateLimiter;
use super::rules::RuleError;
use super::{Rejection, SecurityConfig};
use crate::security_log;
use crate::telemetry::{record_admission_rejected, SecurityEvent};

/// Rate limiter plus content filter, evaluated in that order.
pub struct AdmissionGate {
    limiter: RateLimiter,
    filter: PromptInjectionFilter,
}

impl AdmissionGate {
    pub fn new(config: &SecurityConfig) -> Result<Self, RuleError> {
        Ok(Self {
            limiter: RateLimiter::new(config.rate_limit.clone()),
            filter: PromptInjectionFilter::new(&config.rules)?,
        })
    }

    /// Build from already constructed parts.
    pub fn from_parts(limiter: RateLimiter, filter: PromptInjectionFilter) -> Self {
        Self { limiter, filter }
    }

    /// Admit or reject one secure request from `identity` carrying `input`.
    ///
    /// Both fields are required and must be non-blank.
    pub fn admit(&self, identity: &str, input: &str) -> Result<(), Rejection> {
        self.guarded(identity, || {
            Self::require(identity, "userId")?;
            Self::require(input, "input")?;
            self.screen(identity, input)
        })
    }

    /// Admit or reject a cache query sent on behalf of `identity`.
    ///
    /// Query text may be empty; only the caller identity is required.
    pub fn admit_query(&self, identity: &str, query: &str) -> Result<(), Rejection> {
        self.guarded(identity, || {
            Self::require(identity, "userId")?;
            self.screen(identity, query)
        })
    }

    /// Run `check`, turning a panic into `InternalFault`, and audit any
    /// rejection.
    fn guarded<F>(&self, identity: &str, check: F) -> Result<(), Rejection>
    where
        F: FnOnce() -> Result<(), Rejection>,
    {
        let result =
            catch_unwind(AssertUnwindSafe(check)).unwrap_or(Err(Rejection::InternalFault));

        if let Err(rejection) = &result {
            self.audit(identity, rejection);
            record_admission_rejected(rejection.kind());
        }
        result
    }

    fn require(value: &str, field: &'static str) -> Result<(), Rejection> {
        if value.trim().is_empty() {
            return Err(Rejection::Malformed(field));
        }
        Ok(())
    }

    /// Rate window first, then content rules.
    fn screen(&self, identity: &str, text: &str) -> Result<(), Rejection> {
        if self.limiter.check_and_record(identity) {
            return Err(Rejection::RateLimited);
        }

        if let Some(m) = self.filter.first_match(text) {
            return Err(Rejection::ContentBlocked(m));
        }

        Ok(())
    }

    fn audit(&self, identity: &str, rejection: &Rejection) {
        match rejection {
            Rejection::Malformed(field) => security_log!(
                SecurityEvent::MalformedRequest,
                "Request missing required field",
                "field" => *field
            ),
            Rejection::RateLimited => security_log!(
                SecurityEvent::RateLimited,
                "Caller exceeded request window",
                "user" => identity
            ),
            Rejection::ContentBlocked(m) => security_log!(
                SecurityEvent::ContentBlocked,
                "Input matched admission rule",
                "user" => identity,
                "pattern" => m.pattern.as_str()
            ),
            Rejection::InternalFault => security_log!(
                SecurityEvent::InternalFault,
                "Admission check failed internally",
                "user" => identity
            ),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn filter(&self) -> &PromptInjectionFilter {
        &self.filter
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::from_parts(RateLimiter::default(), PromptInjectionFilter::default())
    }
}
