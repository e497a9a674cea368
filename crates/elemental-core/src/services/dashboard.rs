use std::collections::BTreeMap;
use std::sync::Arc;

use crate::admission::UsageQuotaGate;
use crate::domain::{
    Collection, DashboardStats, GrowthPoint, Project, ProjectStatus, UsageStats, round1,
};
use crate::error::StoreError;
use crate::ports::{DocumentStore, Query, SortKey};

/// Read-only dashboard aggregates.
///
/// Every figure degrades to zero or empty when the store is unreachable.
pub struct DashboardService {
    store: Arc<dyn DocumentStore>,
    quota: Arc<UsageQuotaGate>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn DocumentStore>, quota: Arc<UsageQuotaGate>) -> Self {
        Self { store, quota }
    }

    async fn projects(&self, user_id: &str, query: &Query) -> Result<Vec<Project>, StoreError> {
        let docs = self
            .store
            .query(user_id, Collection::Projects, query)
            .await?;
        Ok(docs.iter().map(Project::from_document).collect())
    }

    pub async fn stats(&self, user_id: &str) -> DashboardStats {
        let projects = match self.projects(user_id, &Query::new()).await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to compute stats");
                return DashboardStats::default();
            }
        };
        summarize(&projects)
    }

    pub async fn usage(&self, user_id: &str) -> UsageStats {
        self.quota.usage(user_id).await
    }

    /// Cumulative project count per UTC creation day, oldest first.
    pub async fn growth(&self, user_id: &str) -> Vec<GrowthPoint> {
        let query = Query::new().order_by(SortKey::CreatedAt, false);
        match self.projects(user_id, &query).await {
            Ok(projects) => cumulative_growth(&projects),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to compute growth");
                Vec::new()
            }
        }
    }
}

fn summarize(projects: &[Project]) -> DashboardStats {
    if projects.is_empty() {
        return DashboardStats::default();
    }

    let total_score: u64 = projects.iter().map(|p| u64::from(p.overall_score)).sum();
    DashboardStats {
        ideas_analyzed: projects.len(),
        revenue_streams: projects.iter().map(|p| p.revenue_streams_count).sum(),
        success_rate: round1(total_score as f64 / projects.len() as f64),
        active_projects: projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Active)
            .count(),
    }
}

fn cumulative_growth(projects: &[Project]) -> Vec<GrowthPoint> {
    let mut per_day: BTreeMap<String, usize> = BTreeMap::new();
    for project in projects {
        let day = project.created_at.date_naive().to_string();
        *per_day.entry(day).or_default() += 1;
    }

    let mut running = 0;
    per_day
        .into_iter()
        .map(|(date, count)| {
            running += count;
            GrowthPoint {
                date,
                count: running,
            }
        })
        .collect()
}
