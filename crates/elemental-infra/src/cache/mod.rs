//! Response cache implementations - Redis and in-memory fallback.

mod memory;

pub use memory::{InMemoryResponseCache, ResponseCacheConfig};

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisResponseCache};
