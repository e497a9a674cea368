//! Application configuration loaded from environment variables.

use std::env;

use elemental_core::admission::QuotaFailurePolicy;
use elemental_core::domain::PlanLimits;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Use Redis for the store, cache and limiter when `REDIS_URL` is set.
    pub use_redis: bool,
    pub quota_policy: QuotaFailurePolicy,
    pub plan_limits: PlanLimits,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = PlanLimits::default();
        let quota_policy = match env::var("QUOTA_FAIL_OPEN").as_deref() {
            Ok("false") | Ok("0") => QuotaFailurePolicy::FailClosed,
            _ => QuotaFailurePolicy::FailOpen,
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            use_redis: env::var("REDIS_URL").is_ok(),
            quota_policy,
            plan_limits: PlanLimits {
                starter: limit_var("PLAN_LIMIT_STARTER", defaults.starter),
                pro: limit_var("PLAN_LIMIT_PRO", defaults.pro),
                empire: limit_var("PLAN_LIMIT_EMPIRE", defaults.empire),
            },
        }
    }
}

fn limit_var(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
