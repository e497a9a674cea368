//! Request rate limiting port.

use std::time::Duration;

use async_trait::async_trait;

/// Per-key request limiter sitting in front of every LLM-backed call.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Admit or reject one request for `key`. Only admitted requests are
    /// counted against the window.
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError>;
}

/// Outcome of one limiter check.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Window capacity.
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes.
    pub reset_after: Duration,
}

impl RateLimitResult {
    pub fn admitted(limit: u32, remaining: u32, reset_after: Duration) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_after,
        }
    }

    pub fn rejected(limit: u32, reset_after: Duration) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_after,
        }
    }

    /// How long a rejected caller should wait; `None` when admitted.
    pub fn retry_after(&self) -> Option<Duration> {
        (!self.allowed).then_some(self.reset_after)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limiter backend unavailable: {0}")]
    Backend(String),
}
