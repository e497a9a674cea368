//! # Elemental Infrastructure
//!
//! Concrete implementations of the ports defined in `elemental-core`.
//! This crate contains the rate limiters, response caches, document stores,
//! identity verifiers, and the LLM analysis client.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `auth` - Firebase and HMAC bearer-token verification
//! - `openrouter` - OpenRouter chat-completions analyzer
//! - `redis` - Redis support for rate limiting, caching, and documents

pub mod analysis;
pub mod cache;
pub mod rate_limit;
pub mod store;

#[cfg(feature = "auth")]
pub mod auth;

// Re-exports - In-Memory
pub use analysis::FallbackAnalyzer;
pub use cache::{InMemoryResponseCache, ResponseCacheConfig};
pub use rate_limit::{FixedWindowRateLimiter, RateLimitConfig, RateLimitScope};
pub use store::InMemoryDocumentStore;

#[cfg(feature = "auth")]
pub use auth::{FirebaseConfig, FirebaseTokenVerifier, HmacConfig, HmacTokenVerifier};

#[cfg(feature = "openrouter")]
pub use analysis::{OpenRouterAnalyzer, OpenRouterConfig};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisConfig, RedisResponseCache};
#[cfg(feature = "redis")]
pub use rate_limit::{RedisRateLimitConfig, RedisRateLimiter};
#[cfg(feature = "redis")]
pub use store::RedisDocumentStore;
