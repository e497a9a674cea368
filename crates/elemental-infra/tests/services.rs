mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use elemental_core::admission::QuotaFailurePolicy;
use elemental_core::clock::ManualClock;
use elemental_core::domain::{
    AlertKind, Collection, DeconstructionResult, DocPath, PivotStatus, ProjectStatus,
};
use elemental_core::ports::{DocumentStore, VerifiedIdentity};
use elemental_core::services::{
    AlertService, AnalysisService, DashboardService, PivotService, ProjectService, UserService,
};
use elemental_core::{AdmissionError, DomainError, UsageQuotaGate};
use elemental_infra::{
    FallbackAnalyzer, InMemoryDocumentStore, InMemoryResponseCache, ResponseCacheConfig,
};

use common::{
    InterleavingStore, UnreachableStore, controller, fields, limiter, seed_user, usage_count,
};

struct Harness {
    store: Arc<InMemoryDocumentStore>,
    cache_clock: ManualClock,
    projects: Arc<ProjectService>,
    alerts: Arc<AlertService>,
    pivots: Arc<PivotService>,
    analysis: AnalysisService,
}

fn harness(rate_limit: u32) -> Harness {
    let store = Arc::new(InMemoryDocumentStore::new());
    let cache_clock = ManualClock::new();
    let cache = Arc::new(InMemoryResponseCache::with_clock(
        ResponseCacheConfig::default(),
        cache_clock.clone(),
    ));
    let (limiter, _clock) = limiter(rate_limit);

    let projects = Arc::new(ProjectService::new(store.clone(), cache));
    let alerts = Arc::new(AlertService::new(store.clone()));
    let pivots = Arc::new(PivotService::new(store.clone()));
    let admission = Arc::new(controller(
        limiter,
        store.clone(),
        QuotaFailurePolicy::FailClosed,
    ));
    let analysis = AnalysisService::new(
        admission,
        Arc::new(FallbackAnalyzer),
        projects.clone(),
        alerts.clone(),
        pivots.clone(),
    );

    Harness {
        store,
        cache_clock,
        projects,
        alerts,
        pivots,
        analysis,
    }
}

async fn saved_project(h: &Harness, user_id: &str) -> String {
    let result = DeconstructionResult::fallback("Handmade candles", "USD");
    h.projects
        .create_from_analysis(user_id, &result)
        .await
        .unwrap()
        .id
}

/// Rename a project behind the service's back.
async fn rename_in_store(h: &Harness, user_id: &str, project_id: &str, name: &str) {
    h.store
        .update(
            &DocPath::new(user_id, Collection::Projects, project_id),
            fields(json!({ "name": name })),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_project_reads_go_through_the_cache() {
    let h = harness(100);
    let id = saved_project(&h, "u1").await;

    let first = h.projects.get("u1", &id).await.unwrap();
    rename_in_store(&h, "u1", &id, "Renamed").await;

    let cached = h.projects.get("u1", &id).await.unwrap();
    assert_eq!(cached.name, first.name);

    h.cache_clock.advance(Duration::from_secs(301));
    let fresh = h.projects.get("u1", &id).await.unwrap();
    assert_eq!(fresh.name, "Renamed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_read_racing_a_status_update_does_not_cache_stale_project() {
    let store = Arc::new(InterleavingStore::new());
    let projects = Arc::new(ProjectService::new(
        store.clone(),
        Arc::new(InMemoryResponseCache::default()),
    ));
    let result = DeconstructionResult::fallback("Handmade candles", "USD");
    let id = projects.create_from_analysis("u1", &result).await.unwrap().id;

    store.hold_next_project_read();
    let reader = tokio::spawn({
        let projects = projects.clone();
        let id = id.clone();
        async move { projects.get("u1", &id).await }
    });
    store.read_taken.notified().await;

    projects
        .update_status("u1", &id, ProjectStatus::Paused)
        .await
        .unwrap();
    store.release.notify_one();

    let raced = reader.await.unwrap().unwrap();
    assert_eq!(raced.status, ProjectStatus::Active);
    assert_eq!(
        projects.get("u1", &id).await.unwrap().status,
        ProjectStatus::Paused
    );
}

#[tokio::test]
async fn test_status_update_invalidates_cached_project() {
    let h = harness(100);
    let id = saved_project(&h, "u1").await;
    h.projects.get("u1", &id).await.unwrap();

    h.projects
        .update_status("u1", &id, ProjectStatus::Paused)
        .await
        .unwrap();

    let project = h.projects.get("u1", &id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Paused);
}

#[tokio::test]
async fn test_delete_invalidates_cached_project() {
    let h = harness(100);
    let id = saved_project(&h, "u1").await;
    h.projects.get("u1", &id).await.unwrap();

    h.projects.delete("u1", &id).await.unwrap();

    let err = h.projects.get("u1", &id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
    let err = h.projects.delete("u1", &id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_projects_are_scoped_to_their_owner() {
    let h = harness(100);
    let id = saved_project(&h, "u1").await;

    let err = h.projects.get("u2", &id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_update_status_on_missing_project_is_not_found() {
    let h = harness(100);
    let err = h
        .projects
        .update_status("u1", "missing", ProjectStatus::Archived)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_deconstruct_saves_project_raises_alerts_and_charges_once() {
    let h = harness(100);

    let result = h
        .analysis
        .deconstruct("client", "u1", "  Organic soap  ", "NGN")
        .await
        .unwrap();

    let project_id = result.project_id.clone().unwrap();
    let project = h.projects.get("u1", &project_id).await.unwrap();
    assert_eq!(project.original_idea, "Organic soap");
    assert_eq!(project.currency, "NGN");
    assert_eq!(project.revenue_streams_count, 7);

    let alerts = h.alerts.active("u1", 10).await;
    let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
    assert_eq!(alerts.len(), 2);
    assert!(kinds.contains(&AlertKind::Warning));
    assert!(kinds.contains(&AlertKind::Success));
    assert!(alerts
        .iter()
        .all(|a| a.project_id.as_deref() == Some(project_id.as_str())));

    assert_eq!(usage_count(&*h.store, "u1").await, 1);
}

#[tokio::test]
async fn test_deconstruct_rejects_blank_idea_without_charging() {
    let h = harness(100);
    let err = h
        .analysis
        .deconstruct("client", "u1", "   ", "USD")
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(usage_count(&*h.store, "u1").await, 0);
}

#[tokio::test]
async fn test_deconstruct_over_quota_saves_nothing() {
    let h = harness(100);
    seed_user(&h.store, "u1", Some("starter"), 10).await;

    let err = h
        .analysis
        .deconstruct("client", "u1", "Soap", "USD")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DomainError::Admission(AdmissionError::QuotaExceeded { .. })
    ));
    assert!(h.projects.recent("u1", 10).await.is_empty());
    assert_eq!(usage_count(&*h.store, "u1").await, 10);
}

#[tokio::test]
async fn test_pivot_on_missing_project_does_not_consume_quota() {
    let h = harness(100);
    let err = h
        .analysis
        .pivot("client", "u1", "missing", "Teaching", "USD")
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::NotFound { .. }));
    assert_eq!(usage_count(&*h.store, "u1").await, 0);
}

#[tokio::test]
async fn test_pivot_is_saved_and_listed_per_project() {
    let h = harness(100);
    let id = saved_project(&h, "u1").await;
    let other = saved_project(&h, "u1").await;

    let pivot = h
        .analysis
        .pivot("client", "u1", &id, "Teaching", "USD")
        .await
        .unwrap();
    assert_eq!(pivot.status, PivotStatus::Active);
    assert_eq!(pivot.project_id.as_deref(), Some(id.as_str()));

    assert_eq!(h.pivots.list("u1", Some(&id)).await.len(), 1);
    assert!(h.pivots.list("u1", Some(&other)).await.is_empty());

    let updated = h
        .pivots
        .update_status("u1", &pivot.id, PivotStatus::Implemented)
        .await
        .unwrap();
    assert_eq!(updated.status, PivotStatus::Implemented);
}

#[tokio::test]
async fn test_diagnose_records_diagnosis_past_a_warm_cache() {
    let h = harness(100);
    let id = saved_project(&h, "u1").await;
    assert!(h.projects.get("u1", &id).await.unwrap().diagnosis.is_none());

    let diagnosis = h
        .analysis
        .diagnose("client", "u1", &id, "No sales", "USD")
        .await
        .unwrap();

    let project = h.projects.get("u1", &id).await.unwrap();
    assert_eq!(project.diagnosis, Some(diagnosis));
    assert_eq!(usage_count(&*h.store, "u1").await, 1);
}

#[tokio::test]
async fn test_rate_limited_pivot_surfaces_retry_after() {
    let h = harness(1);
    let id = saved_project(&h, "u1").await;

    h.analysis
        .pivot("client", "u1", &id, "Teaching", "USD")
        .await
        .unwrap();
    let err = h
        .analysis
        .pivot("client", "u1", &id, "Teaching", "USD")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DomainError::Admission(AdmissionError::RateLimited { .. })
    ));
}

#[tokio::test]
async fn test_dismissed_alerts_leave_the_active_list() {
    let h = harness(100);
    h.analysis
        .deconstruct("client", "u1", "Soap", "USD")
        .await
        .unwrap();

    let alerts = h.alerts.active("u1", 10).await;
    h.alerts.dismiss("u1", &alerts[0].id).await.unwrap();

    let remaining = h.alerts.active("u1", 10).await;
    assert_eq!(remaining.len(), alerts.len() - 1);
    assert!(remaining.iter().all(|a| a.id != alerts[0].id));

    let err = h.alerts.dismiss("u1", "missing").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_user_sync_assigns_starter_only_once() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let users = UserService::new(store.clone());
    let identity = VerifiedIdentity {
        email: Some("ada@example.com".to_string()),
        ..VerifiedIdentity::new("u1")
    };

    let profile = users.sync(&identity).await.unwrap();
    assert_eq!(profile.plan.as_deref(), Some("starter"));
    assert_eq!(profile.email.as_deref(), Some("ada@example.com"));

    store
        .set(&DocPath::user("u1"), fields(json!({ "plan": "pro" })), true)
        .await
        .unwrap();
    let profile = users.sync(&identity).await.unwrap();
    assert_eq!(profile.plan.as_deref(), Some("pro"));
    assert!(profile.last_login.is_some());
}

#[tokio::test]
async fn test_dashboard_reads_degrade_to_empty_on_outage() {
    let store: Arc<dyn DocumentStore> = Arc::new(UnreachableStore);
    let quota = Arc::new(UsageQuotaGate::new(
        store.clone(),
        Default::default(),
        QuotaFailurePolicy::FailClosed,
    ));
    let dashboard = DashboardService::new(store, quota);

    let stats = dashboard.stats("u1").await;
    assert_eq!(stats.ideas_analyzed, 0);
    assert!(dashboard.growth("u1").await.is_empty());
    assert_eq!(dashboard.usage("u1").await.current_usage, 0);
}

#[tokio::test]
async fn test_dashboard_stats_over_saved_projects() {
    let h = harness(100);
    saved_project(&h, "u1").await;
    let id = saved_project(&h, "u1").await;
    h.projects
        .update_status("u1", &id, ProjectStatus::Completed)
        .await
        .unwrap();

    let quota = Arc::new(UsageQuotaGate::new(
        h.store.clone(),
        Default::default(),
        QuotaFailurePolicy::FailOpen,
    ));
    let dashboard = DashboardService::new(h.store.clone(), quota);
    let stats = dashboard.stats("u1").await;

    assert_eq!(stats.ideas_analyzed, 2);
    assert_eq!(stats.revenue_streams, 14);
    assert_eq!(stats.success_rate, 85.0);
    assert_eq!(stats.active_projects, 1);

    let growth = dashboard.growth("u1").await;
    assert_eq!(growth.last().map(|p| p.count), Some(2));
}
