//! Per-identity sliding-log rate limiting.
//!
//! Each identity keeps the timestamps of its admitted requests inside the
//! trailing window. A refused attempt is not recorded.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Configuration for the rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Admitted requests allowed per window.
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
        }
    }
}

/// Sliding-log rate limiter keyed by caller identity.
///
/// The DashMap entry guard makes prune+check+append atomic for one identity
/// while other identities proceed on other shards.
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let config = RateLimitConfig {
            max_requests: config.max_requests.max(1),
            window: config.window,
        };
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    /// Returns `true` when the identity is over its limit.
    ///
    /// Under the limit the current attempt is appended to the window.
    pub fn check_and_record(&self, identity: &str) -> bool {
        let now = Instant::now();
        let mut window = self.windows.entry(identity.to_string()).or_default();
        prune(&mut window, now, self.config.window);

        if window.len() >= self.config.max_requests {
            return true;
        }
        window.push_back(now);
        false
    }

    /// Admitted requests currently inside the window for `identity`.
    pub fn in_window(&self, identity: &str) -> usize {
        let now = Instant::now();
        match self.windows.get_mut(identity) {
            Some(mut window) => {
                prune(&mut window, now, self.config.window);
                window.len()
            }
            None => 0,
        }
    }

    /// Forget identities with no requests left in the window.
    pub fn purge_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        let window_len = self.config.window;
        self.windows.retain(|_, window| {
            prune(window, now, window_len);
            !window.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of identities being tracked.
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
    while let Some(&oldest) = window.front() {
        if now.saturating_duration_since(oldest) >= span {
            window.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: usize, window_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests: max,
            window: Duration::from_millis(window_ms),
        })
    }

    #[test]
    fn test_allows_up_to_limit() {
        let rl = limiter(3, 60_000);
        assert!(!rl.check_and_record("alice"));
        assert!(!rl.check_and_record("alice"));
        assert!(!rl.check_and_record("alice"));
        assert!(rl.check_and_record("alice"));
    }

    #[test]
    fn test_refused_attempt_not_recorded() {
        let rl = limiter(2, 60_000);
        rl.check_and_record("bob");
        rl.check_and_record("bob");
        for _ in 0..5 {
            assert!(rl.check_and_record("bob"));
        }
        assert_eq!(rl.in_window("bob"), 2);
    }

    #[test]
    fn test_identities_are_independent() {
        let rl = limiter(1, 60_000);
        assert!(!rl.check_and_record("a"));
        assert!(rl.check_and_record("a"));
        assert!(!rl.check_and_record("b"));
    }

    #[test]
    fn test_window_slides() {
        let rl = limiter(1, 30);
        assert!(!rl.check_and_record("carol"));
        assert!(rl.check_and_record("carol"));
        std::thread::sleep(Duration::from_millis(60));
        assert!(!rl.check_and_record("carol"));
    }

    #[test]
    fn test_purge_idle() {
        let rl = limiter(5, 20);
        rl.check_and_record("x");
        rl.check_and_record("y");
        assert_eq!(rl.tracked_identities(), 2);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(rl.purge_idle(), 2);
        assert_eq!(rl.tracked_identities(), 0);
    }

    #[test]
    fn test_unknown_identity_has_empty_window() {
        let rl = RateLimiter::default();
        assert_eq!(rl.in_window("nobody"), 0);
        assert_eq!(rl.config().max_requests, 5);
    }
}
