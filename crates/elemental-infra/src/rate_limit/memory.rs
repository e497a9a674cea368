//! In-memory fixed-window rate limiter.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use elemental_core::clock::{Clock, SystemClock};
use elemental_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

const GLOBAL_KEY: &str = "__global__";

/// Which requests share a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitScope {
    /// One window per client key.
    #[default]
    PerClient,
    /// One window shared by every client.
    Global,
}

impl RateLimitScope {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_client" | "per-client" | "client" => Some(Self::PerClient),
            "global" => Some(Self::Global),
            _ => None,
        }
    }
}

/// In-memory rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
    pub scope: RateLimitScope,
    /// Key count above which expired windows are swept.
    pub max_tracked_keys: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window: Duration::from_secs(60),
            scope: RateLimitScope::PerClient,
            max_tracked_keys: 10_000,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_requests),
            window: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.window),
            scope: std::env::var("RATE_LIMIT_SCOPE")
                .ok()
                .and_then(|s| RateLimitScope::parse(&s))
                .unwrap_or(defaults.scope),
            max_tracked_keys: std::env::var("RATE_LIMIT_MAX_TRACKED_KEYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_tracked_keys),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

/// Fixed-window counter per client key.
///
/// A window rolls over once `now - started_at >= window`. Only admitted
/// requests are counted. Limits are per-process, not distributed across
/// instances.
pub struct FixedWindowRateLimiter<C: Clock = SystemClock> {
    windows: Mutex<HashMap<String, Window>>,
    config: RateLimitConfig,
    clock: C,
}

impl FixedWindowRateLimiter<SystemClock> {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn from_env() -> Self {
        Self::new(RateLimitConfig::from_env())
    }
}

impl<C: Clock> FixedWindowRateLimiter<C> {
    pub fn with_clock(config: RateLimitConfig, clock: C) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Number of windows currently held.
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }

    fn decide(&self, key: &str) -> RateLimitResult {
        let key = match self.config.scope {
            RateLimitScope::PerClient => key,
            RateLimitScope::Global => GLOBAL_KEY,
        };
        let now = self.clock.now();
        let window = self.config.window;

        let mut windows = self.windows.lock();
        if windows.len() >= self.config.max_tracked_keys && !windows.contains_key(key) {
            windows.retain(|_, w| now.duration_since(w.started_at) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now.duration_since(entry.started_at) >= window {
            entry.started_at = now;
            entry.count = 0;
        }

        let reset_after = window.saturating_sub(now.duration_since(entry.started_at));
        let limit = self.config.max_requests;
        if entry.count < limit {
            entry.count += 1;
            RateLimitResult::admitted(limit, limit - entry.count, reset_after)
        } else {
            RateLimitResult::rejected(limit, reset_after)
        }
    }
}

#[async_trait]
impl<C: Clock> RateLimiter for FixedWindowRateLimiter<C> {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        Ok(self.decide(key))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use elemental_core::clock::ManualClock;

    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> (FixedWindowRateLimiter<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let config = RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
            ..Default::default()
        };
        (FixedWindowRateLimiter::with_clock(config, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_twenty_per_minute_then_reset() {
        let (limiter, clock) = limiter(20, 60);

        for i in 0..20 {
            let res = limiter.check("client").await.unwrap();
            assert!(res.allowed, "request {i} should be allowed");
            assert_eq!(res.remaining, 19 - i);
        }

        let res = limiter.check("client").await.unwrap();
        assert!(!res.allowed);
        assert_eq!(res.remaining, 0);
        assert_eq!(res.reset_after, Duration::from_secs(60));

        clock.advance(Duration::from_secs(61));
        assert!(limiter.check("client").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_window_rolls_over_exactly_at_boundary() {
        let (limiter, clock) = limiter(1, 60);
        assert!(limiter.check("client").await.unwrap().allowed);

        clock.advance(Duration::from_millis(59_999));
        let res = limiter.check("client").await.unwrap();
        assert!(!res.allowed);
        assert_eq!(res.reset_after, Duration::from_millis(1));

        clock.advance(Duration::from_millis(1));
        assert!(limiter.check("client").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_rejected_requests_are_not_counted() {
        let (limiter, clock) = limiter(2, 60);
        limiter.check("client").await.unwrap();
        limiter.check("client").await.unwrap();
        for _ in 0..5 {
            assert!(!limiter.check("client").await.unwrap().allowed);
        }

        clock.advance(Duration::from_secs(60));
        let res = limiter.check("client").await.unwrap();
        assert!(res.allowed);
        assert_eq!(res.remaining, 1);
    }

    #[tokio::test]
    async fn test_clients_have_independent_windows() {
        let (limiter, _clock) = limiter(1, 60);
        assert!(limiter.check("alice").await.unwrap().allowed);
        assert!(!limiter.check("alice").await.unwrap().allowed);
        assert!(limiter.check("bob").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_global_scope_shares_one_window() {
        let clock = ManualClock::new();
        let limiter = FixedWindowRateLimiter::with_clock(
            RateLimitConfig {
                max_requests: 1,
                scope: RateLimitScope::Global,
                ..Default::default()
            },
            clock,
        );

        assert!(limiter.check("alice").await.unwrap().allowed);
        assert!(!limiter.check("bob").await.unwrap().allowed);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test]
    async fn test_expired_windows_are_swept_past_threshold() {
        let clock = ManualClock::new();
        let limiter = FixedWindowRateLimiter::with_clock(
            RateLimitConfig {
                max_requests: 5,
                max_tracked_keys: 3,
                ..Default::default()
            },
            clock.clone(),
        );

        for key in ["a", "b", "c"] {
            limiter.check(key).await.unwrap();
        }
        clock.advance(Duration::from_secs(60));
        limiter.check("d").await.unwrap();

        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checks_never_exceed_limit() {
        let (limiter, _clock) = limiter(50, 60);
        let limiter = Arc::new(limiter);

        let handles: Vec<_> = (0..200)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.check("client").await.unwrap().allowed })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 50);
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(RateLimitScope::parse("Global"), Some(RateLimitScope::Global));
        assert_eq!(RateLimitScope::parse("per_client"), Some(RateLimitScope::PerClient));
        assert_eq!(RateLimitScope::parse("weird"), None);
    }
}
