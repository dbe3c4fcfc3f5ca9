//! Configuration types.

use std::time::Duration;

/// Guardrail pipeline configuration.
#[derive(Debug, Clone)]
pub struct GuardrailConfig {
    /// Fail the WAF check when any of the three expected headers is missing.
    ///
    /// Permissive by default: missing headers are recorded as warnings on the
    /// verdict. A high threat score blocks regardless of this flag.
    pub require_waf_headers: bool,
    /// Threat score at or above which the request is always blocked (0–100).
    pub threat_score_block: u32,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            require_waf_headers: false,
            threat_score_block: 80,
        }
    }
}

/// Fixed-window rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Admissions allowed per window.
    pub max_per_window: u32,
    /// Window duration.
    pub window: Duration,
    /// Map size above which expired windows are swept on admission.
    pub sweep_threshold: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_window: 5,
            window: Duration::from_secs(60),
            sweep_threshold: 1024,
        }
    }
}

/// Skill router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Name of the skill force-consulted for sensitive topics.
    pub safety_skill_name: String,
    /// Maximum number of keywords extracted per skill for scoring.
    pub keyword_limit: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            safety_skill_name: "security-review".to_string(),
            keyword_limit: 50,
        }
    }
}

/// Source reconciler configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Mean company/role similarity at or above which two observations are
    /// considered the same application.
    pub match_threshold: f64,
    /// Window within which source priority, not recency, decides.
    pub recency_window: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.85,
            recency_window: Duration::from_secs(5 * 60),
        }
    }
}
