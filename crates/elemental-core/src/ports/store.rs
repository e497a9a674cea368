//! Document store port - per-user collections with server timestamps.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Collection, DocPath, Document, Fields};
use crate::error::StoreError;

/// Equality filter on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

/// Server-assigned timestamps a query can sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub key: SortKey,
    pub descending: bool,
}

/// Collection query: filters, then order, then limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, key: SortKey, descending: bool) -> Self {
        self.order_by = Some(OrderBy { key, descending });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document passes every filter.
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|f| doc.fields.get(&f.field) == Some(&f.value))
    }

    /// Apply ordering and limit to already-filtered documents.
    ///
    /// The sort is stable, so callers supply ties in insertion order.
    pub fn finish(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if let Some(order) = self.order_by {
            docs.sort_by(|a, b| {
                let ord = match order.key {
                    SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                    SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                };
                if order.descending { ord.reverse() } else { ord }
            });
        }
        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        docs
    }
}

/// Outcome of [`DocumentStore::increment_below`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundedIncrement {
    /// The field was bumped; carries the new value.
    Applied(i64),
    /// The field was already at or above the ceiling; carries its value.
    AtCeiling(i64),
}

/// Document store trait - abstraction over the external store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// Create a document with a store-generated id.
    async fn create(
        &self,
        user_id: &str,
        collection: Collection,
        fields: Fields,
    ) -> Result<Document, StoreError>;

    /// Write a document. With `merge`, existing fields not in `fields` survive.
    async fn set(&self, path: &DocPath, fields: Fields, merge: bool)
    -> Result<Document, StoreError>;

    /// Merge fields into an existing document; `StoreError::NotFound` if absent.
    async fn update(&self, path: &DocPath, fields: Fields) -> Result<Document, StoreError>;

    /// Remove a document. Deleting a missing document succeeds.
    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;

    /// Atomically add `by` to a numeric field, creating the document if needed.
    /// Returns the new value.
    async fn atomic_increment(
        &self,
        path: &DocPath,
        field: &str,
        by: i64,
    ) -> Result<i64, StoreError>;

    /// Add one to a numeric field only while it is below `ceiling`, as a
    /// single atomic step. A missing field reads as zero.
    async fn increment_below(
        &self,
        path: &DocPath,
        field: &str,
        ceiling: i64,
    ) -> Result<BoundedIncrement, StoreError>;

    async fn query(
        &self,
        user_id: &str,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError>;
}
