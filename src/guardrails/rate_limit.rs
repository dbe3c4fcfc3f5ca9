//! Per-identity rate limiting.
//!
//! `RateLimiter` is the collaborator seam the guardrail pipeline consults —
//! implementations may be in-process or remote. `FixedWindowLimiter` is the
//! built-in reference: fixed window per identity, default 5 admissions per
//! 60-second window, with opportunistic eviction of expired windows so the
//! identity map stays bounded under churn.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::config::RateLimitConfig;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Seconds until the window frees up, always ≥ 1 when denied.
    pub retry_after_seconds: Option<u64>,
}

impl RateDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after_seconds: None,
        }
    }

    pub fn denied(retry_after_seconds: u64) -> Self {
        Self {
            allowed: false,
            retry_after_seconds: Some(retry_after_seconds.max(1)),
        }
    }
}

/// Rate-limiter collaborator consulted by the guardrail pipeline.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check (and consume) one admission slot for `identity`.
    async fn check(&self, identity: &str) -> RateDecision;
}

/// A live admission window for one identity.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// In-process fixed-window limiter.
///
/// The read-check-increment on a single identity happens under one lock
/// acquisition, so two concurrent requests can never both take the last
/// slot.
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Number of identities currently tracked.
    pub fn tracked_identities(&self) -> usize {
        self.windows.lock().expect("limiter lock poisoned").len()
    }

    /// Check one admission at an explicit instant. Exposed for tests.
    pub fn check_at(&self, identity: &str, now: Instant) -> RateDecision {
        let mut windows = self.windows.lock().expect("limiter lock poisoned");

        // Bounded map: sweep expired windows once the map grows past the
        // threshold, instead of letting distinct identities accumulate.
        if windows.len() >= self.config.sweep_threshold {
            let window = self.config.window;
            let before = windows.len();
            windows.retain(|_, w| now.duration_since(w.window_start) <= window);
            debug!(
                evicted = before - windows.len(),
                remaining = windows.len(),
                "Swept expired rate windows"
            );
        }

        match windows.get_mut(identity) {
            Some(w) if now.duration_since(w.window_start) <= self.config.window => {
                if w.count >= self.config.max_per_window {
                    let elapsed = now.duration_since(w.window_start);
                    let remaining_ms = self
                        .config
                        .window
                        .as_millis()
                        .saturating_sub(elapsed.as_millis());
                    let retry = (remaining_ms as u64).div_ceil(1000).max(1);
                    return RateDecision::denied(retry);
                }
                w.count += 1;
                RateDecision::allowed()
            }
            _ => {
                windows.insert(
                    identity.to_string(),
                    RateWindow {
                        count: 1,
                        window_start: now,
                    },
                );
                RateDecision::allowed()
            }
        }
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check(&self, identity: &str) -> RateDecision {
        self.check_at(identity, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn five_admissions_then_denial_with_retry_after() {
        let limiter = FixedWindowLimiter::default();
        let now = Instant::now();

        for attempt in 1..=5 {
            let d = limiter.check_at("user-1", now);
            assert!(d.allowed, "attempt {attempt} should be allowed");
        }

        let sixth = limiter.check_at("user-1", now);
        assert!(!sixth.allowed);
        assert!(sixth.retry_after_seconds.unwrap() >= 1);
    }

    #[test]
    fn identities_do_not_share_windows() {
        let limiter = FixedWindowLimiter::default();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.check_at("user-1", now).allowed);
        }
        assert!(!limiter.check_at("user-1", now).allowed);
        assert!(limiter.check_at("user-2", now).allowed);
    }

    #[test]
    fn window_expiry_resets_the_count() {
        let limiter = FixedWindowLimiter::default();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.check_at("user-1", now).allowed);
        }
        assert!(!limiter.check_at("user-1", now).allowed);

        let later = now + Duration::from_secs(61);
        assert!(limiter.check_at("user-1", later).allowed);
    }

    #[test]
    fn retry_after_reflects_remaining_window() {
        let limiter = FixedWindowLimiter::default();
        let now = Instant::now();

        for _ in 0..5 {
            limiter.check_at("user-1", now);
        }
        // 10 seconds in, 50 remain.
        let denied = limiter.check_at("user-1", now + Duration::from_secs(10));
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_seconds, Some(50));
    }

    #[test]
    fn retry_after_is_floored_at_one_second() {
        let limiter = FixedWindowLimiter::default();
        let now = Instant::now();

        for _ in 0..5 {
            limiter.check_at("user-1", now);
        }
        let denied = limiter.check_at("user-1", now + Duration::from_millis(59_900));
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_seconds, Some(1));
    }

    #[test]
    fn expired_windows_are_swept_past_threshold() {
        let limiter = FixedWindowLimiter::new(RateLimitConfig {
            max_per_window: 5,
            window: Duration::from_secs(60),
            sweep_threshold: 4,
        });
        let now = Instant::now();

        for i in 0..4 {
            limiter.check_at(&format!("user-{i}"), now);
        }
        assert_eq!(limiter.tracked_identities(), 4);

        // All four windows have expired; the next admission triggers a sweep.
        let later = now + Duration::from_secs(120);
        limiter.check_at("user-fresh", later);
        assert_eq!(limiter.tracked_identities(), 1);
    }

    #[tokio::test]
    async fn trait_object_dispatch() {
        let limiter: std::sync::Arc<dyn RateLimiter> =
            std::sync::Arc::new(FixedWindowLimiter::default());
        assert!(limiter.check("user-1").await.allowed);
    }
}
