//! Application state - shared across all handlers.

use std::sync::Arc;

use elemental_core::admission::{AdmissionController, QuotaFailurePolicy, UsageQuotaGate};
use elemental_core::domain::PlanLimits;
use elemental_core::ports::{
    DocumentStore, IdeaAnalyzer, IdentityVerifier, RateLimiter, ResponseCache,
};
use elemental_core::services::{
    AlertService, AnalysisService, DashboardService, PivotService, ProjectService, UserService,
};
use elemental_infra::{
    FirebaseConfig, FirebaseTokenVerifier, FixedWindowRateLimiter, HmacTokenVerifier,
    InMemoryDocumentStore, InMemoryResponseCache, ResponseCacheConfig,
};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub users: Arc<UserService>,
    pub projects: Arc<ProjectService>,
    pub alerts: Arc<AlertService>,
    pub pivots: Arc<PivotService>,
    pub dashboard: Arc<DashboardService>,
    pub analysis: Arc<AnalysisService>,
}

/// Adapters behind the core ports.
pub struct Backends {
    pub store: Arc<dyn DocumentStore>,
    pub cache: Arc<dyn ResponseCache>,
    pub limiter: Arc<dyn RateLimiter>,
}

impl Backends {
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemoryDocumentStore::new()),
            cache: Arc::new(InMemoryResponseCache::new(ResponseCacheConfig::from_env())),
            limiter: Arc::new(FixedWindowRateLimiter::from_env()),
        }
    }

    #[cfg(feature = "redis")]
    async fn redis() -> anyhow::Result<Self> {
        use elemental_infra::{
            RedisDocumentStore, RedisRateLimiter, RedisResponseCache,
        };

        Ok(Self {
            store: Arc::new(RedisDocumentStore::from_env().await?),
            cache: Arc::new(RedisResponseCache::from_env().await?),
            limiter: Arc::new(RedisRateLimiter::from_env().await?),
        })
    }

    async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        if !config.use_redis {
            tracing::warn!("REDIS_URL not set. Running with in-memory store, cache and limiter");
            return Ok(Self::in_memory());
        }

        #[cfg(feature = "redis")]
        {
            match Self::redis().await {
                Ok(backends) => Ok(backends),
                Err(e) if elemental_infra::RedisConfig::from_env().fallback_to_memory => {
                    tracing::error!(error = %e, "Redis unavailable. Falling back to in-memory adapters");
                    Ok(Self::in_memory())
                }
                Err(e) => Err(e),
            }
        }

        #[cfg(not(feature = "redis"))]
        {
            tracing::warn!("Built without the redis feature - ignoring REDIS_URL");
            Ok(Self::in_memory())
        }
    }
}

fn build_verifier() -> anyhow::Result<Arc<dyn IdentityVerifier>> {
    match FirebaseConfig::from_env() {
        Some(config) => {
            tracing::info!(project_id = %config.project_id, "Verifying Firebase ID tokens");
            Ok(Arc::new(FirebaseTokenVerifier::new(config)?))
        }
        None => {
            tracing::warn!("FIREBASE_PROJECT_ID not set. Verifying locally signed HS256 tokens");
            Ok(Arc::new(HmacTokenVerifier::from_env()))
        }
    }
}

fn build_analyzer() -> anyhow::Result<Arc<dyn IdeaAnalyzer>> {
    #[cfg(feature = "openrouter")]
    {
        Ok(Arc::new(elemental_infra::OpenRouterAnalyzer::from_env()?))
    }

    #[cfg(not(feature = "openrouter"))]
    {
        tracing::warn!("Built without the openrouter feature - serving fallback analyses");
        Ok(Arc::new(elemental_infra::FallbackAnalyzer))
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let backends = Backends::from_config(config).await?;
        let state = Self::assemble(
            backends,
            build_analyzer()?,
            build_verifier()?,
            config.plan_limits.clone(),
            config.quota_policy,
        );

        tracing::info!(quota_policy = ?config.quota_policy, "Application state initialized");
        Ok(state)
    }

    /// Wire services over the given adapters.
    pub fn assemble(
        backends: Backends,
        analyzer: Arc<dyn IdeaAnalyzer>,
        verifier: Arc<dyn IdentityVerifier>,
        limits: PlanLimits,
        policy: QuotaFailurePolicy,
    ) -> Self {
        let Backends {
            store,
            cache,
            limiter,
        } = backends;

        let quota = Arc::new(UsageQuotaGate::new(store.clone(), limits, policy));
        let admission = Arc::new(AdmissionController::new(limiter, quota.clone()));

        let projects = Arc::new(ProjectService::new(store.clone(), cache));
        let alerts = Arc::new(AlertService::new(store.clone()));
        let pivots = Arc::new(PivotService::new(store.clone()));
        let analysis = Arc::new(AnalysisService::new(
            admission,
            analyzer,
            projects.clone(),
            alerts.clone(),
            pivots.clone(),
        ));

        Self {
            verifier,
            users: Arc::new(UserService::new(store.clone())),
            dashboard: Arc::new(DashboardService::new(store, quota)),
            projects,
            alerts,
            pivots,
            analysis,
        }
    }
}
