//! Document store implementations.

mod memory;

pub use memory::InMemoryDocumentStore;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::RedisDocumentStore;
