//! Rate limiting implementations.

mod memory;

pub use memory::{FixedWindowRateLimiter, RateLimitConfig, RateLimitScope};

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisRateLimitConfig, RedisRateLimiter};
