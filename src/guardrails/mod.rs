//! Guardrail pipeline — pre-execution checks gating every task.
//!
//! Checks run in fixed order, fail-fast: WAF header sanity, then the
//! prompt-injection scan, then rate limiting. A request rejected by an
//! earlier check never reaches the rate limiter, so an attack attempt does
//! not consume rate budget.

pub mod injection;
pub mod rate_limit;
pub mod waf;

pub use injection::InjectionScanner;
pub use rate_limit::{FixedWindowLimiter, RateDecision, RateLimiter};
pub use waf::{WafCheck, verify_waf_headers};

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{debug, warn};

use crate::config::GuardrailConfig;
use crate::error::SinkError;
use crate::sink::{AuditSink, InjectionEvent};

/// Which check failed, when one did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    WafBlocked,
    PromptInjection,
    RateLimited,
}

impl FailureKind {
    /// Short label for logging and wire responses.
    pub fn label(&self) -> &'static str {
        match self {
            Self::WafBlocked => "waf_blocked",
            Self::PromptInjection => "prompt_injection",
            Self::RateLimited => "rate_limited",
        }
    }
}

/// Verdict for one task attempt. Ephemeral — recomputed per attempt.
#[derive(Debug, Clone)]
pub struct GuardrailVerdict {
    pub passed: bool,
    pub failure: Option<FailureKind>,
    /// Present only for `RateLimited`, always ≥ 1.
    pub retry_after_seconds: Option<u64>,
    /// Non-fatal observations (e.g. missing WAF headers under permissive mode).
    pub warnings: Vec<String>,
    /// Matched injection pattern id, for audit logging.
    pub matched_pattern: Option<String>,
}

impl GuardrailVerdict {
    fn pass(warnings: Vec<String>) -> Self {
        Self {
            passed: true,
            failure: None,
            retry_after_seconds: None,
            warnings,
            matched_pattern: None,
        }
    }

    fn fail(kind: FailureKind, warnings: Vec<String>) -> Self {
        Self {
            passed: false,
            failure: Some(kind),
            retry_after_seconds: None,
            warnings,
            matched_pattern: None,
        }
    }
}

/// The guardrail pipeline. One instance serves all tasks.
pub struct GuardrailPipeline {
    config: GuardrailConfig,
    scanner: InjectionScanner,
    /// Audit sink notified on injection matches, before the verdict returns.
    sink: Option<Arc<dyn AuditSink>>,
}

impl GuardrailPipeline {
    pub fn new(config: GuardrailConfig) -> Self {
        Self {
            config,
            scanner: InjectionScanner::new(),
            sink: None,
        }
    }

    /// Attach the audit sink for injection notifications.
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Evaluate all checks for one task attempt.
    ///
    /// Suspends only while awaiting the rate-limiter collaborator or the
    /// audit sink. A sink write failure propagates — audit records are never
    /// silently dropped.
    pub async fn evaluate(
        &self,
        task_text: &str,
        identity: Option<&str>,
        origin: Option<&str>,
        headers: Option<&HeaderMap>,
        limiter: Option<&Arc<dyn RateLimiter>>,
    ) -> Result<GuardrailVerdict, SinkError> {
        let mut warnings = Vec::new();

        // 1. WAF header sanity — cheap, local, first.
        if let Some(headers) = headers {
            let check = verify_waf_headers(headers, &self.config);
            if !check.ok(self.config.require_waf_headers) {
                warn!(
                    identity = ?identity,
                    blocked = check.blocked,
                    warnings = ?check.warnings,
                    "Request failed WAF checks"
                );
                return Ok(GuardrailVerdict::fail(
                    FailureKind::WafBlocked,
                    check.warnings,
                ));
            }
            warnings = check.warnings;
        }

        // 2. Prompt-injection scan — before rate limiting, so attack
        //    attempts are rejected and logged rather than throttled.
        if let Some(pattern) = self.scanner.detect(task_text) {
            warn!(
                identity = ?identity,
                pattern,
                "Prompt injection detected"
            );
            if let Some(sink) = &self.sink {
                sink.notify_injection(InjectionEvent {
                    identity: identity.map(String::from),
                    origin: origin.map(String::from),
                    reason: pattern.to_string(),
                })
                .await?;
            }
            let mut verdict = GuardrailVerdict::fail(FailureKind::PromptInjection, warnings);
            verdict.matched_pattern = Some(pattern.to_string());
            return Ok(verdict);
        }

        // 3. Rate limiting — only with both an identity and a limiter.
        if let (Some(identity), Some(limiter)) = (identity, limiter) {
            let decision = limiter.check(identity).await;
            if !decision.allowed {
                let retry = decision.retry_after_seconds.unwrap_or(1).max(1);
                debug!(identity, retry_after = retry, "Request rate limited");
                let mut verdict = GuardrailVerdict::fail(FailureKind::RateLimited, warnings);
                verdict.retry_after_seconds = Some(retry);
                return Ok(verdict);
            }
        }

        Ok(GuardrailVerdict::pass(warnings))
    }
}
