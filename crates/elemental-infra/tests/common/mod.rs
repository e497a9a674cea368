#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

use elemental_core::admission::{QuotaFailurePolicy, UsageQuotaGate, usage_path};
use elemental_core::clock::ManualClock;
use elemental_core::domain::{Collection, DocPath, Document, Fields, PlanLimits};
use elemental_core::ports::{
    BoundedIncrement, DocumentStore, Query, RateLimitError, RateLimitResult, RateLimiter,
};
use elemental_core::{AdmissionController, StoreError};
use elemental_infra::{FixedWindowRateLimiter, InMemoryDocumentStore, RateLimitConfig};

pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

/// Seed a user's plan and usage counter.
pub async fn seed_user(store: &InMemoryDocumentStore, user_id: &str, plan: Option<&str>, count: u64) {
    if let Some(plan) = plan {
        store
            .set(&DocPath::user(user_id), fields(json!({ "plan": plan })), true)
            .await
            .unwrap();
    }
    if count > 0 {
        store
            .set(&usage_path(user_id), fields(json!({ "count": count })), true)
            .await
            .unwrap();
    }
}

pub async fn usage_count(store: &dyn DocumentStore, user_id: &str) -> u64 {
    store
        .get(&usage_path(user_id))
        .await
        .unwrap()
        .and_then(|d| d.get_u64("count"))
        .unwrap_or(0)
}

pub fn limiter(max_requests: u32) -> (Arc<FixedWindowRateLimiter<ManualClock>>, ManualClock) {
    let clock = ManualClock::new();
    let limiter = FixedWindowRateLimiter::with_clock(
        RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
            ..Default::default()
        },
        clock.clone(),
    );
    (Arc::new(limiter), clock)
}

pub fn controller(
    limiter: Arc<dyn RateLimiter>,
    store: Arc<dyn DocumentStore>,
    policy: QuotaFailurePolicy,
) -> AdmissionController {
    let quota = Arc::new(UsageQuotaGate::new(store, PlanLimits::default(), policy));
    AdmissionController::new(limiter, quota)
}

/// Store whose every call fails as if the backend were unreachable.
pub struct UnreachableStore;

fn unreachable_err() -> StoreError {
    StoreError::Connection("connection refused".to_string())
}

#[async_trait]
impl DocumentStore for UnreachableStore {
    async fn get(&self, _path: &DocPath) -> Result<Option<Document>, StoreError> {
        Err(unreachable_err())
    }

    async fn create(
        &self,
        _user_id: &str,
        _collection: Collection,
        _fields: Fields,
    ) -> Result<Document, StoreError> {
        Err(unreachable_err())
    }

    async fn set(
        &self,
        _path: &DocPath,
        _fields: Fields,
        _merge: bool,
    ) -> Result<Document, StoreError> {
        Err(unreachable_err())
    }

    async fn update(&self, _path: &DocPath, _fields: Fields) -> Result<Document, StoreError> {
        Err(unreachable_err())
    }

    async fn delete(&self, _path: &DocPath) -> Result<(), StoreError> {
        Err(unreachable_err())
    }

    async fn atomic_increment(
        &self,
        _path: &DocPath,
        _field: &str,
        _by: i64,
    ) -> Result<i64, StoreError> {
        Err(unreachable_err())
    }

    async fn increment_below(
        &self,
        _path: &DocPath,
        _field: &str,
        _ceiling: i64,
    ) -> Result<BoundedIncrement, StoreError> {
        Err(unreachable_err())
    }

    async fn query(
        &self,
        _user_id: &str,
        _collection: Collection,
        _query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        Err(unreachable_err())
    }
}

/// In-memory store that yields on every read and can hold one project read
/// open after it has fetched the document.
pub struct InterleavingStore {
    inner: InMemoryDocumentStore,
    hold_next_project_read: AtomicBool,
    /// Signalled once the held read has its snapshot.
    pub read_taken: Notify,
    /// Releases the held read.
    pub release: Notify,
}

impl InterleavingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryDocumentStore::new(),
            hold_next_project_read: AtomicBool::new(false),
            read_taken: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn inner(&self) -> &InMemoryDocumentStore {
        &self.inner
    }

    pub fn hold_next_project_read(&self) {
        self.hold_next_project_read.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for InterleavingStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        tokio::task::yield_now().await;
        let doc = self.inner.get(path).await?;
        if path.collection == Collection::Projects
            && self.hold_next_project_read.swap(false, Ordering::SeqCst)
        {
            self.read_taken.notify_one();
            self.release.notified().await;
        }
        tokio::task::yield_now().await;
        Ok(doc)
    }

    async fn create(
        &self,
        user_id: &str,
        collection: Collection,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        self.inner.create(user_id, collection, fields).await
    }

    async fn set(
        &self,
        path: &DocPath,
        fields: Fields,
        merge: bool,
    ) -> Result<Document, StoreError> {
        self.inner.set(path, fields, merge).await
    }

    async fn update(&self, path: &DocPath, fields: Fields) -> Result<Document, StoreError> {
        self.inner.update(path, fields).await
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        self.inner.delete(path).await
    }

    async fn atomic_increment(
        &self,
        path: &DocPath,
        field: &str,
        by: i64,
    ) -> Result<i64, StoreError> {
        self.inner.atomic_increment(path, field, by).await
    }

    async fn increment_below(
        &self,
        path: &DocPath,
        field: &str,
        ceiling: i64,
    ) -> Result<BoundedIncrement, StoreError> {
        self.inner.increment_below(path, field, ceiling).await
    }

    async fn query(
        &self,
        user_id: &str,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.query(user_id, collection, query).await
    }
}

/// Limiter whose backend always errors.
pub struct BrokenLimiter;

#[async_trait]
impl RateLimiter for BrokenLimiter {
    async fn check(&self, _key: &str) -> Result<RateLimitResult, RateLimitError> {
        Err(RateLimitError::Backend("redis down".to_string()))
    }
}
