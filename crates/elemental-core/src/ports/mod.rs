//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod analysis;
mod auth;
mod cache;
mod rate_limit;
mod store;

pub use analysis::{AnalysisError, IdeaAnalyzer};
pub use auth::{AuthError, IdentityVerifier, VerifiedIdentity};
pub use cache::{CacheError, CacheGeneration, CacheKey, ResponseCache};
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
pub use store::{BoundedIncrement, DocumentStore, Filter, OrderBy, Query, SortKey};
