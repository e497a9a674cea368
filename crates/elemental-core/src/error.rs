//! Domain-level error types.

use std::time::Duration;

use thiserror::Error;

use crate::ports::{AnalysisError, CacheError};

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error("Upstream analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Cache failure: {0}")]
    Cache(#[from] CacheError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }
}

/// Rejections produced by the admission-control core.
///
/// All of them are terminal for the request that triggered them.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Rate limit exceeded, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("AI generation limit reached for plan '{plan}' ({used}/{limit})")]
    QuotaExceeded { plan: String, used: u64, limit: u64 },

    #[error("Usage store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Document store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Store operation failed: {0}")]
    Query(String),

    #[error("Document not found")]
    NotFound,

    #[error("Document encoding failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
