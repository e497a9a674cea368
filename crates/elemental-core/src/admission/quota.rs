//! Per-user, per-plan generation quota.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{Collection, DocPath, Document, Plan, PlanLimits, UsageStats, round1};
use crate::error::{AdmissionError, StoreError};
use crate::ports::{BoundedIncrement, DocumentStore};

pub const USAGE_DOC_ID: &str = "ai_generations";
pub const USAGE_COUNT_FIELD: &str = "count";

/// Location of a user's generation counter.
pub fn usage_path(user_id: &str) -> DocPath {
    DocPath::new(user_id, Collection::Usage, USAGE_DOC_ID)
}

/// What to do when the usage store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotaFailurePolicy {
    /// Admit the request and log a warning.
    #[default]
    FailOpen,
    /// Reject the request with `AdmissionError::StoreUnavailable`.
    FailClosed,
}

/// Outcome of a quota evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub plan: String,
    pub used: u64,
    pub limit: u64,
    /// True when the store was unreachable and the fail-open policy applied.
    pub degraded: bool,
}

/// A generation charged against the user's plan.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaCharge {
    pub plan: String,
    pub limit: u64,
    /// Count after the charge; `None` when the store was unreachable under
    /// the fail-open policy and nothing was recorded.
    pub usage_after: Option<u64>,
}

/// Enforces plan ceilings using counters held in the external store.
///
/// Increments go through the store's atomic primitive so counters stay
/// correct across several server processes.
pub struct UsageQuotaGate {
    store: Arc<dyn DocumentStore>,
    limits: PlanLimits,
    on_store_failure: QuotaFailurePolicy,
}

impl UsageQuotaGate {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        limits: PlanLimits,
        on_store_failure: QuotaFailurePolicy,
    ) -> Self {
        Self {
            store,
            limits,
            on_store_failure,
        }
    }

    pub fn limits(&self) -> &PlanLimits {
        &self.limits
    }

    async fn read_usage(&self, user_id: &str) -> Result<(Option<String>, u64), StoreError> {
        let profile = self.store.get(&DocPath::user(user_id)).await?;
        let plan = profile
            .as_ref()
            .and_then(|d| d.get_str("plan"))
            .map(String::from);

        let usage = self.store.get(&usage_path(user_id)).await?;
        let used = usage.as_ref().map(read_count).unwrap_or(0);

        Ok((plan, used))
    }

    /// Evaluate the user's quota without consuming it.
    pub async fn evaluate(&self, user_id: &str) -> Result<QuotaDecision, AdmissionError> {
        match self.read_usage(user_id).await {
            Ok((plan, used)) => {
                let limit = self.limits.limit_for_name(plan.as_deref());
                Ok(QuotaDecision {
                    allowed: used < limit,
                    plan: plan.unwrap_or_else(|| Plan::Starter.to_string()),
                    used,
                    limit,
                    degraded: false,
                })
            }
            Err(e) => match self.on_store_failure {
                QuotaFailurePolicy::FailOpen => {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        "Usage store unavailable, admitting request (fail open)"
                    );
                    Ok(QuotaDecision {
                        allowed: true,
                        plan: Plan::Starter.to_string(),
                        used: 0,
                        limit: self.limits.starter,
                        degraded: true,
                    })
                }
                QuotaFailurePolicy::FailClosed => {
                    tracing::error!(user_id = %user_id, error = %e, "Usage store unavailable");
                    Err(AdmissionError::StoreUnavailable(e.to_string()))
                }
            },
        }
    }

    /// Check the ceiling and charge one generation in a single atomic step.
    ///
    /// Concurrent callers for the same user can never push the counter past
    /// the plan limit.
    pub async fn consume(&self, user_id: &str) -> Result<QuotaCharge, AdmissionError> {
        let plan = match self.store.get(&DocPath::user(user_id)).await {
            Ok(profile) => profile
                .as_ref()
                .and_then(|d| d.get_str("plan"))
                .map(String::from),
            Err(e) => return self.degraded_charge(user_id, e),
        };
        let limit = self.limits.limit_for_name(plan.as_deref());
        let plan = plan.unwrap_or_else(|| Plan::Starter.to_string());
        let ceiling = i64::try_from(limit).unwrap_or(i64::MAX);

        match self
            .store
            .increment_below(&usage_path(user_id), USAGE_COUNT_FIELD, ceiling)
            .await
        {
            Ok(BoundedIncrement::Applied(count)) => {
                tracing::debug!(user_id = %user_id, count, limit, "AI usage charged");
                Ok(QuotaCharge {
                    plan,
                    limit,
                    usage_after: Some(count.max(0) as u64),
                })
            }
            Ok(BoundedIncrement::AtCeiling(count)) => {
                tracing::info!(
                    user_id = %user_id,
                    plan = %plan,
                    used = count,
                    limit,
                    "AI generation quota exhausted"
                );
                Err(AdmissionError::QuotaExceeded {
                    plan,
                    used: count.max(0) as u64,
                    limit,
                })
            }
            Err(e) => self.degraded_charge(user_id, e),
        }
    }

    fn degraded_charge(
        &self,
        user_id: &str,
        err: StoreError,
    ) -> Result<QuotaCharge, AdmissionError> {
        match self.on_store_failure {
            QuotaFailurePolicy::FailOpen => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %err,
                    "Usage store unavailable, admitting request uncounted (fail open)"
                );
                Ok(QuotaCharge {
                    plan: Plan::Starter.to_string(),
                    limit: self.limits.starter,
                    usage_after: None,
                })
            }
            QuotaFailurePolicy::FailClosed => {
                tracing::error!(user_id = %user_id, error = %err, "Usage store unavailable");
                Err(AdmissionError::StoreUnavailable(err.to_string()))
            }
        }
    }

    /// Whether the user still has generations left on their plan.
    pub async fn may_proceed(&self, user_id: &str) -> Result<bool, AdmissionError> {
        Ok(self.evaluate(user_id).await?.allowed)
    }

    /// Charge one generation. Returns the new count, or `None` when the
    /// store was unreachable under the fail-open policy.
    pub async fn increment(&self, user_id: &str) -> Result<Option<u64>, AdmissionError> {
        match self
            .store
            .atomic_increment(&usage_path(user_id), USAGE_COUNT_FIELD, 1)
            .await
        {
            Ok(count) => {
                tracing::debug!(user_id = %user_id, count, "AI usage incremented");
                Ok(Some(count.max(0) as u64))
            }
            Err(e) => match self.on_store_failure {
                QuotaFailurePolicy::FailOpen => {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        "Usage increment failed, request proceeds uncounted"
                    );
                    Ok(None)
                }
                QuotaFailurePolicy::FailClosed => {
                    Err(AdmissionError::StoreUnavailable(e.to_string()))
                }
            },
        }
    }

    /// Usage summary for the dashboard. Degrades to an empty starter summary
    /// when the store is unreachable.
    pub async fn usage(&self, user_id: &str) -> UsageStats {
        let (plan, used) = match self.read_usage(user_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to read usage stats");
                (None, 0)
            }
        };

        let limit = self.limits.limit_for_name(plan.as_deref());
        let percentage = if limit > 0 {
            round1(used as f64 / limit as f64 * 100.0)
        } else {
            0.0
        };

        UsageStats {
            plan: plan.unwrap_or_else(|| Plan::Starter.to_string()),
            current_usage: used,
            limit,
            percentage,
        }
    }
}

fn read_count(doc: &Document) -> u64 {
    match doc.get(USAGE_COUNT_FIELD) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        _ => 0,
    }
}
