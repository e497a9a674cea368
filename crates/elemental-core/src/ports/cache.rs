use async_trait::async_trait;

use crate::domain::Document;

/// Short-lived cache of documents keyed by `(owner, resource_id)`.
///
/// Not a source of truth: losing every entry only costs latency.
/// Every mutation path must call [`ResponseCache::invalidate`] for the
/// affected key before it returns to its caller.
///
/// Read-through callers take a [`CacheGeneration`] before reading the store
/// and hand it to `put`, which refuses the snapshot if the key was
/// invalidated in between.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Cached document, or `None` on a miss or an expired entry.
    async fn get(&self, owner: &str, resource_id: &str) -> Option<Document>;

    /// Invalidation state of the key, taken before a store read.
    async fn generation(&self, owner: &str, resource_id: &str) -> CacheGeneration;

    /// Store a snapshot read after `seen` was taken. Returns `false`, leaving
    /// the cache untouched, when the key was invalidated since.
    async fn put(
        &self,
        owner: &str,
        resource_id: &str,
        document: &Document,
        seen: CacheGeneration,
    ) -> Result<bool, CacheError>;

    /// Drop the entry unconditionally and refuse puts of older snapshots.
    async fn invalidate(&self, owner: &str, resource_id: &str) -> Result<(), CacheError>;
}

/// Opaque invalidation counter for one cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeneration(Option<u64>);

impl CacheGeneration {
    /// The backend could not report a generation; puts against it are refused.
    pub const UNKNOWN: Self = Self(None);

    pub fn new(value: u64) -> Self {
        Self(Some(value))
    }

    pub fn value(&self) -> Option<u64> {
        self.0
    }
}

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub owner: String,
    pub resource_id: String,
}

impl CacheKey {
    pub fn new(owner: &str, resource_id: &str) -> Self {
        Self {
            owner: owner.to_string(),
            resource_id: resource_id.to_string(),
        }
    }
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}
