//! Redis rate limiter implementation using a fixed-window counter.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;

use elemental_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

use super::RateLimitScope;
use crate::cache::RedisConfig;

/// Admits iff the window count is below the limit. The key expires with the
/// window, so a missing key is a fresh window. Rejections do not touch it.
/// Returns: [allowed, count, pttl_ms]
const FIXED_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local max_requests = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])

local current = tonumber(redis.call('GET', key) or '0')
if current >= max_requests then
    return {0, current, redis.call('PTTL', key)}
end

current = redis.call('INCR', key)
if current == 1 then
    redis.call('PEXPIRE', key, window_ms)
end

return {1, current, redis.call('PTTL', key)}
"#;

/// Redis rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RedisRateLimitConfig {
    /// Redis connection config
    pub redis: RedisConfig,
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window duration
    pub window: Duration,
    pub scope: RateLimitScope,
    /// Key prefix for rate limit keys
    pub key_prefix: String,
}

impl Default for RedisRateLimitConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            max_requests: 20,
            window: Duration::from_secs(60),
            scope: RateLimitScope::PerClient,
            key_prefix: "ratelimit".to_string(),
        }
    }
}

impl RedisRateLimitConfig {
    /// Shares the `RATE_LIMIT_*` variables with the in-memory limiter.
    pub fn from_env() -> Self {
        let window = super::RateLimitConfig::from_env();
        Self {
            redis: RedisConfig::from_env(),
            max_requests: window.max_requests,
            window: window.window,
            scope: window.scope,
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| "ratelimit".to_string()),
        }
    }
}

/// Redis-backed fixed-window limiter, shared by every server process.
pub struct RedisRateLimiter {
    conn: ConnectionManager,
    config: RedisRateLimitConfig,
    script: Script,
}

impl RedisRateLimiter {
    pub async fn new(config: RedisRateLimitConfig) -> Result<Self, RateLimitError> {
        let conn = config
            .redis
            .connect()
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;

        tracing::info!(url = %config.redis.url, "Connected to Redis rate limiter");

        Ok(Self {
            conn,
            config,
            script: Script::new(FIXED_WINDOW_SCRIPT),
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, RateLimitError> {
        Self::new(RedisRateLimitConfig::from_env()).await
    }

    fn make_key(&self, key: &str) -> String {
        match self.config.scope {
            RateLimitScope::PerClient => format!("{}:{}", self.config.key_prefix, key),
            RateLimitScope::Global => format!("{}:global", self.config.key_prefix),
        }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let redis_key = self.make_key(key);
        let mut conn = self.conn.clone();

        let result: Vec<i64> = self
            .script
            .key(&redis_key)
            .arg(self.config.max_requests)
            .arg(self.config.window.as_millis() as u64)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;

        let allowed = result.first().copied().unwrap_or(0) == 1;
        let count = result.get(1).copied().unwrap_or(0).max(0) as u32;
        // PTTL is negative when the key has no expiry; treat that as a full window.
        let reset_after = match result.get(2).copied() {
            Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
            _ => self.config.window,
        };

        let limit = self.config.max_requests;
        Ok(if allowed {
            RateLimitResult::admitted(limit, limit.saturating_sub(count), reset_after)
        } else {
            RateLimitResult::rejected(limit, reset_after)
        })
    }
}
