mod common;

use std::sync::Arc;
use std::time::Duration;

use elemental_core::AdmissionError;
use elemental_core::admission::{QuotaFailurePolicy, UsageQuotaGate};
use elemental_core::domain::PlanLimits;
use elemental_core::ports::DocumentStore;
use elemental_infra::InMemoryDocumentStore;

use common::{
    BrokenLimiter, InterleavingStore, UnreachableStore, controller, limiter, seed_user, usage_count,
};

fn gate(store: Arc<dyn DocumentStore>, policy: QuotaFailurePolicy) -> UsageQuotaGate {
    UsageQuotaGate::new(store, PlanLimits::default(), policy)
}

#[tokio::test]
async fn test_may_proceed_once_at_limit_minus_one() {
    let store = Arc::new(InMemoryDocumentStore::new());
    seed_user(&store, "u1", Some("pro"), 149).await;
    let gate = gate(store.clone(), QuotaFailurePolicy::FailOpen);

    assert!(gate.may_proceed("u1").await.unwrap());
    assert_eq!(gate.increment("u1").await.unwrap(), Some(150));
    assert!(!gate.may_proceed("u1").await.unwrap());
}

#[tokio::test]
async fn test_missing_plan_and_usage_default_to_starter() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let gate = gate(store, QuotaFailurePolicy::FailOpen);

    let decision = gate.evaluate("new-user").await.unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.plan, "starter");
    assert_eq!(decision.used, 0);
    assert_eq!(decision.limit, 10);
}

#[tokio::test]
async fn test_unrecognized_plan_gets_starter_limit() {
    let store = Arc::new(InMemoryDocumentStore::new());
    seed_user(&store, "u1", Some("gold"), 10).await;
    let gate = gate(store, QuotaFailurePolicy::FailOpen);

    let decision = gate.evaluate("u1").await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.limit, 10);
    assert_eq!(decision.plan, "gold");
}

#[tokio::test]
async fn test_starter_at_nine_admits_once_then_quota_exceeded() {
    let store = Arc::new(InMemoryDocumentStore::new());
    seed_user(&store, "u1", Some("starter"), 9).await;
    let (limiter, _clock) = limiter(100);
    let admission = controller(limiter, store.clone(), QuotaFailurePolicy::FailOpen);

    let ticket = admission.admit("u1", "u1").await.unwrap();
    assert_eq!(ticket.usage_after, Some(10));
    assert_eq!(ticket.limit, 10);

    let err = admission.admit("u1", "u1").await.unwrap_err();
    assert!(matches!(
        err,
        AdmissionError::QuotaExceeded { used: 10, limit: 10, .. }
    ));
    assert_eq!(usage_count(&*store, "u1").await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_lose_no_updates() {
    let store = Arc::new(InMemoryDocumentStore::new());
    seed_user(&store, "u1", Some("empire"), 5).await;
    let gate = Arc::new(gate(store.clone(), QuotaFailurePolicy::FailClosed));

    let handles: Vec<_> = (0..64)
        .map(|_| {
            let gate = gate.clone();
            tokio::spawn(async move { gate.increment("u1").await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(usage_count(&*store, "u1").await, 5 + 64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admits_at_limit_minus_one_admit_exactly_one() {
    let store = Arc::new(InterleavingStore::new());
    seed_user(store.inner(), "u1", Some("starter"), 9).await;
    let (limiter, _clock) = limiter(100);
    let admission = Arc::new(controller(limiter, store.clone(), QuotaFailurePolicy::FailClosed));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let admission = admission.clone();
            tokio::spawn(async move { admission.admit(&format!("client-{i}"), "u1").await })
        })
        .collect();

    let mut admitted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(ticket) => {
                admitted += 1;
                assert_eq!(ticket.usage_after, Some(10));
            }
            Err(AdmissionError::QuotaExceeded { used: 10, limit: 10, .. }) => rejected += 1,
            Err(other) => panic!("unexpected admission error: {other:?}"),
        }
    }

    assert_eq!((admitted, rejected), (1, 7));
    assert_eq!(usage_count(store.inner(), "u1").await, 10);
}

#[tokio::test]
async fn test_rate_limit_rejects_before_charging_quota() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let (limiter, clock) = limiter(1);
    let admission = controller(limiter, store.clone(), QuotaFailurePolicy::FailOpen);

    admission.admit("client", "u1").await.unwrap();
    let err = admission.admit("client", "u1").await.unwrap_err();
    match err {
        AdmissionError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Duration::from_secs(60));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
    assert_eq!(usage_count(&*store, "u1").await, 1);

    clock.advance(Duration::from_secs(61));
    admission.admit("client", "u1").await.unwrap();
    assert_eq!(usage_count(&*store, "u1").await, 2);
}

#[tokio::test]
async fn test_store_outage_fail_open_admits_uncounted() {
    let (limiter, _clock) = limiter(10);
    let admission = controller(limiter, Arc::new(UnreachableStore), QuotaFailurePolicy::FailOpen);

    let ticket = admission.admit("u1", "u1").await.unwrap();
    assert_eq!(ticket.usage_after, None);
    assert_eq!(ticket.plan, "starter");
}

#[tokio::test]
async fn test_store_outage_fail_closed_rejects() {
    let (limiter, _clock) = limiter(10);
    let admission = controller(
        limiter,
        Arc::new(UnreachableStore),
        QuotaFailurePolicy::FailClosed,
    );

    let err = admission.admit("u1", "u1").await.unwrap_err();
    assert!(matches!(err, AdmissionError::StoreUnavailable(_)));
}

#[tokio::test]
async fn test_limiter_backend_error_fails_open() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let admission = controller(
        Arc::new(BrokenLimiter),
        store.clone(),
        QuotaFailurePolicy::FailOpen,
    );

    let ticket = admission.admit("client", "u1").await.unwrap();
    assert_eq!(ticket.remaining_requests, None);
    assert_eq!(ticket.usage_after, Some(1));
}

#[tokio::test]
async fn test_usage_summary() {
    let store = Arc::new(InMemoryDocumentStore::new());
    seed_user(&store, "u1", Some("pro"), 20).await;
    let gate = gate(store, QuotaFailurePolicy::FailOpen);

    let usage = gate.usage("u1").await;
    assert_eq!(usage.plan, "pro");
    assert_eq!(usage.current_usage, 20);
    assert_eq!(usage.limit, 150);
    assert_eq!(usage.percentage, 13.3);
}

#[tokio::test]
async fn test_usage_summary_degrades_on_outage() {
    let gate = gate(Arc::new(UnreachableStore), QuotaFailurePolicy::FailClosed);
    let usage = gate.usage("u1").await;
    assert_eq!(usage.current_usage, 0);
    assert_eq!(usage.limit, 10);
}
