//! Fixed-window request rate limiting per client identity.
//!
//! Each identity gets a counter that resets once its window has elapsed.
//! Requests straddling a window edge can briefly reach twice the limit; the
//! counter is deliberately not a sliding log.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request admitted; `remaining` more fit in the current window
    Allowed { remaining: u32 },
    /// Limit exceeded; the client should wait `retry_after`
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u32,
    reset_at: Instant,
}

/// Per-identity fixed-window counter
///
/// Records are kept for every identity ever seen; there is one small record
/// per identity and no eviction.
#[derive(Debug)]
pub struct RequestRateLimiter {
    /// Window length
    window: Duration,
    /// Maximum requests per identity per window
    max_requests: u32,
    /// identity -> current window
    records: Mutex<HashMap<String, WindowRecord>>,
}

impl RequestRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &shared::config::RateLimitConfig) -> Self {
        Self::new(config.window(), config.max_requests)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count a request from `identity` at `now`
    pub fn check(&self, identity: &str, now: Instant) -> RateDecision {
        let mut records = self.lock();

        if let Some(record) = records.get_mut(identity) {
            if record.reset_at > now {
                record.count = record.count.saturating_add(1);
                if record.count > self.max_requests {
                    tracing::debug!(
                        identity = identity,
                        count = record.count,
                        "Rate limit exceeded"
                    );
                    return RateDecision::Limited {
                        retry_after: self.window,
                    };
                }
                return RateDecision::Allowed {
                    remaining: self.max_requests - record.count,
                };
            }
        }

        records.insert(
            identity.to_string(),
            WindowRecord {
                count: 1,
                reset_at: now + self.window,
            },
        );
        RateDecision::Allowed {
            remaining: self.max_requests.saturating_sub(1),
        }
    }

    /// Number of identities with a record
    pub fn tracked_identities(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, WindowRecord>> {
        // a check never leaves a record half-written
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_limit_then_reject() {
        let limiter = RequestRateLimiter::new(WINDOW, 3);
        let now = Instant::now();

        for expected_remaining in [2, 1, 0] {
            assert_eq!(
                limiter.check("1.2.3.4", now),
                RateDecision::Allowed {
                    remaining: expected_remaining
                }
            );
        }
        assert_eq!(
            limiter.check("1.2.3.4", now + Duration::from_secs(59)),
            RateDecision::Limited { retry_after: WINDOW }
        );
    }

    #[test]
    fn test_window_reset_at_boundary() {
        let limiter = RequestRateLimiter::new(WINDOW, 2);
        let start = Instant::now();

        assert!(limiter.check("a", start).is_allowed());
        assert!(limiter.check("a", start).is_allowed());
        assert!(!limiter.check("a", start).is_allowed());

        // reaching reset_at exactly opens a new window with count 1
        assert_eq!(
            limiter.check("a", start + WINDOW),
            RateDecision::Allowed { remaining: 1 }
        );
        assert!(limiter.check("a", start + WINDOW).is_allowed());
        assert!(!limiter.check("a", start + WINDOW).is_allowed());
    }

    #[test]
    fn test_identities_are_isolated() {
        let limiter = RequestRateLimiter::new(WINDOW, 1);
        let now = Instant::now();

        assert!(limiter.check("a", now).is_allowed());
        assert!(!limiter.check("a", now).is_allowed());
        assert!(limiter.check("b", now).is_allowed());
        assert!(limiter.check("anon", now).is_allowed());
        assert_eq!(limiter.tracked_identities(), 3);
    }

    #[test]
    fn test_rejections_keep_counting_within_window() {
        let limiter = RequestRateLimiter::new(WINDOW, 1);
        let now = Instant::now();

        assert!(limiter.check("a", now).is_allowed());
        for _ in 0..10 {
            assert!(!limiter.check("a", now).is_allowed());
        }
        assert!(limiter.check("a", now + WINDOW).is_allowed());
    }

    #[test]
    fn test_boundary_burst_is_allowed() {
        let limiter = RequestRateLimiter::new(WINDOW, 2);
        let start = Instant::now();
        let edge = start + WINDOW - Duration::from_millis(1);

        // first request opens the window, the rest land just before its edge
        assert!(limiter.check("a", start).is_allowed());
        assert!(limiter.check("a", edge).is_allowed());
        assert!(limiter.check("a", start + WINDOW).is_allowed());
        assert!(limiter.check("a", start + WINDOW).is_allowed());
        assert!(!limiter.check("a", start + WINDOW).is_allowed());
    }
}
