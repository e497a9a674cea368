//! In-memory document store - used when no external store is configured
//! and as the test double for the services.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use elemental_core::StoreError;
use elemental_core::domain::{Collection, DocPath, Document, Fields};
use elemental_core::ports::{BoundedIncrement, DocumentStore, Query};

struct Entry {
    doc: Document,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    docs: HashMap<DocPath, Entry>,
    next_seq: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Inner {
    /// Server timestamp, strictly increasing across writes.
    fn timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn numeric_field(&self, path: &DocPath, field: &str) -> i64 {
        self.docs
            .get(path)
            .and_then(|e| e.doc.fields.get(field))
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .unwrap_or(0)
    }

    fn write_number(&mut self, path: &DocPath, field: &str, value: i64) {
        let mut fields = Fields::new();
        fields.insert(field.to_string(), Value::from(value));
        self.upsert(path, fields, true);
    }

    fn upsert(&mut self, path: &DocPath, fields: Fields, merge: bool) -> Document {
        let now = self.timestamp();
        if let Some(entry) = self.docs.get_mut(path) {
            if merge {
                entry.doc.fields.extend(fields);
            } else {
                entry.doc.fields = fields;
            }
            entry.doc.updated_at = now;
            return entry.doc.clone();
        }

        let doc = Document {
            id: path.doc_id.clone(),
            fields,
            created_at: now,
            updated_at: now,
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.docs.insert(
            path.clone(),
            Entry {
                doc: doc.clone(),
                seq,
            },
        );
        doc
    }
}

/// Per-process document store over a single mutex-guarded map.
///
/// Every operation, including `atomic_increment`, runs inside one critical
/// section. Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        Ok(self.inner.lock().docs.get(path).map(|e| e.doc.clone()))
    }

    async fn create(
        &self,
        user_id: &str,
        collection: Collection,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let path = DocPath::new(user_id, collection, Uuid::new_v4().to_string());
        Ok(self.inner.lock().upsert(&path, fields, false))
    }

    async fn set(
        &self,
        path: &DocPath,
        fields: Fields,
        merge: bool,
    ) -> Result<Document, StoreError> {
        Ok(self.inner.lock().upsert(path, fields, merge))
    }

    async fn update(&self, path: &DocPath, fields: Fields) -> Result<Document, StoreError> {
        let mut inner = self.inner.lock();
        if !inner.docs.contains_key(path) {
            return Err(StoreError::NotFound);
        }
        Ok(inner.upsert(path, fields, true))
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        self.inner.lock().docs.remove(path);
        Ok(())
    }

    async fn atomic_increment(
        &self,
        path: &DocPath,
        field: &str,
        by: i64,
    ) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock();
        let next = inner.numeric_field(path, field).saturating_add(by);
        inner.write_number(path, field, next);
        Ok(next)
    }

    async fn increment_below(
        &self,
        path: &DocPath,
        field: &str,
        ceiling: i64,
    ) -> Result<BoundedIncrement, StoreError> {
        let mut inner = self.inner.lock();
        let current = inner.numeric_field(path, field);
        if current >= ceiling {
            return Ok(BoundedIncrement::AtCeiling(current));
        }
        let next = current.saturating_add(1);
        inner.write_number(path, field, next);
        Ok(BoundedIncrement::Applied(next))
    }

    async fn query(
        &self,
        user_id: &str,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.lock();
        let mut matched: Vec<&Entry> = inner
            .docs
            .iter()
            .filter(|(path, e)| {
                path.user_id == user_id && path.collection == collection && query.matches(&e.doc)
            })
            .map(|(_, e)| e)
            .collect();
        matched.sort_by_key(|e| e.seq);

        Ok(query.finish(matched.into_iter().map(|e| e.doc.clone()).collect()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use elemental_core::ports::SortKey;
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[tokio::test]
    async fn test_set_merge_keeps_existing_fields() {
        let store = InMemoryDocumentStore::new();
        let path = DocPath::user("u1");

        store
            .set(&path, fields(json!({"email": "a@b.c", "plan": "pro"})), false)
            .await
            .unwrap();
        let doc = store
            .set(&path, fields(json!({"email": "new@b.c"})), true)
            .await
            .unwrap();

        assert_eq!(doc.get_str("email"), Some("new@b.c"));
        assert_eq!(doc.get_str("plan"), Some("pro"));
        assert!(doc.updated_at > doc.created_at);
    }

    #[tokio::test]
    async fn test_set_without_merge_replaces_fields() {
        let store = InMemoryDocumentStore::new();
        let path = DocPath::user("u1");
        let first = store
            .set(&path, fields(json!({"a": 1})), false)
            .await
            .unwrap();
        let doc = store
            .set(&path, fields(json!({"b": 2})), false)
            .await
            .unwrap();

        assert!(doc.get("a").is_none());
        assert_eq!(doc.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let path = DocPath::new("u1", Collection::Projects, "nope");
        let err = store.update(&path, Fields::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_atomic_increment_creates_then_adds() {
        let store = InMemoryDocumentStore::new();
        let path = DocPath::new("u1", Collection::Usage, "ai_generations");

        assert_eq!(store.atomic_increment(&path, "count", 1).await.unwrap(), 1);
        assert_eq!(store.atomic_increment(&path, "count", 2).await.unwrap(), 3);
        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.get_u64("count"), Some(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let path = DocPath::new("u1", Collection::Usage, "ai_generations");

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let store = store.clone();
                let path = path.clone();
                tokio::spawn(async move { store.atomic_increment(&path, "count", 1).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.get_u64("count"), Some(100));
    }

    #[tokio::test]
    async fn test_increment_below_stops_at_ceiling() {
        let store = InMemoryDocumentStore::new();
        let path = DocPath::new("u1", Collection::Usage, "ai_generations");

        assert_eq!(
            store.increment_below(&path, "count", 2).await.unwrap(),
            BoundedIncrement::Applied(1)
        );
        assert_eq!(
            store.increment_below(&path, "count", 2).await.unwrap(),
            BoundedIncrement::Applied(2)
        );
        assert_eq!(
            store.increment_below(&path, "count", 2).await.unwrap(),
            BoundedIncrement::AtCeiling(2)
        );
        assert_eq!(store.get(&path).await.unwrap().unwrap().get_u64("count"), Some(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bounded_increments_never_pass_ceiling() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let path = DocPath::new("u1", Collection::Usage, "ai_generations");

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                let path = path.clone();
                tokio::spawn(async move { store.increment_below(&path, "count", 10).await })
            })
            .collect();
        let mut applied = 0;
        for handle in handles {
            if let BoundedIncrement::Applied(_) = handle.await.unwrap().unwrap() {
                applied += 1;
            }
        }

        assert_eq!(applied, 10);
        assert_eq!(store.get(&path).await.unwrap().unwrap().get_u64("count"), Some(10));
    }

    #[tokio::test]
    async fn test_query_filters_orders_and_limits_per_user() {
        let store = InMemoryDocumentStore::new();
        for (user, n, dismissed) in [("u1", 1, false), ("u1", 2, true), ("u1", 3, false), ("u2", 4, false)] {
            store
                .create(user, Collection::Alerts, fields(json!({"n": n, "dismissed": dismissed})))
                .await
                .unwrap();
        }

        let query = Query::new()
            .filter("dismissed", false)
            .order_by(SortKey::CreatedAt, true)
            .limit(5);
        let docs = store.query("u1", Collection::Alerts, &query).await.unwrap();

        let ns: Vec<u64> = docs.iter().filter_map(|d| d.get_u64("n")).collect();
        assert_eq!(ns, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .create("u1", Collection::Projects, Fields::new())
            .await
            .unwrap();
        let path = DocPath::new("u1", Collection::Projects, doc.id);

        store.delete(&path).await.unwrap();
        store.delete(&path).await.unwrap();
        assert!(store.get(&path).await.unwrap().is_none());
    }
}
