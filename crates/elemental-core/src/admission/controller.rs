use std::sync::Arc;

use crate::error::AdmissionError;
use crate::ports::RateLimiter;

use super::quota::UsageQuotaGate;

/// Proof that a request passed admission and was charged exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionTicket {
    pub user_id: String,
    pub plan: String,
    pub limit: u64,
    /// Usage count after this request, if the store recorded it.
    pub usage_after: Option<u64>,
    /// Requests left in the current rate-limit window, if known.
    pub remaining_requests: Option<u32>,
}

/// Composes the rate limiter and the usage quota gate.
pub struct AdmissionController {
    limiter: Arc<dyn RateLimiter>,
    quota: Arc<UsageQuotaGate>,
}

impl AdmissionController {
    pub fn new(limiter: Arc<dyn RateLimiter>, quota: Arc<UsageQuotaGate>) -> Self {
        Self { limiter, quota }
    }

    pub fn quota(&self) -> &Arc<UsageQuotaGate> {
        &self.quota
    }

    /// Run the full admission sequence for one LLM-backed request.
    ///
    /// Usage is charged on admission, not on completion: a request aborted
    /// after this returns still counts.
    pub async fn admit(
        &self,
        client_key: &str,
        user_id: &str,
    ) -> Result<AdmissionTicket, AdmissionError> {
        let remaining_requests = match self.limiter.check(client_key).await {
            Ok(result) => match result.retry_after() {
                Some(retry_after) => {
                    tracing::warn!(
                        client_key = %client_key,
                        limit = result.limit,
                        retry_after_secs = retry_after.as_secs(),
                        "Rate limit exceeded"
                    );
                    return Err(AdmissionError::RateLimited { retry_after });
                }
                None => Some(result.remaining),
            },
            Err(e) => {
                tracing::error!(error = %e, "Rate limiter error, failing open");
                None
            }
        };

        let charge = self.quota.consume(user_id).await?;

        Ok(AdmissionTicket {
            user_id: user_id.to_string(),
            plan: charge.plan,
            limit: charge.limit,
            usage_after: charge.usage_after,
            remaining_requests,
        })
    }
}
