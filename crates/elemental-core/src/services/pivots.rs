use std::sync::Arc;

use serde_json::json;

use crate::domain::{Collection, DocPath, Pivot, PivotAnalysis, PivotStatus};
use crate::error::DomainError;
use crate::ports::{DocumentStore, Query, SortKey};

use super::{fields, map_missing};

pub struct PivotService {
    store: Arc<dyn DocumentStore>,
}

impl PivotService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        user_id: &str,
        project_id: &str,
        pivot_name: &str,
        analysis: &PivotAnalysis,
    ) -> Result<Pivot, DomainError> {
        let doc = self
            .store
            .create(
                user_id,
                Collection::Pivots,
                fields(json!({
                    "project_id": project_id,
                    "pivot_name": pivot_name,
                    "analysis": analysis,
                    "status": PivotStatus::Active,
                })),
            )
            .await?;

        tracing::info!(user_id = %user_id, pivot_id = %doc.id, "Pivot saved");
        Ok(Pivot::from_document(&doc))
    }

    /// Pivots newest first, optionally for one project only.
    pub async fn list(&self, user_id: &str, project_id: Option<&str>) -> Vec<Pivot> {
        let mut query = Query::new().order_by(SortKey::CreatedAt, true);
        if let Some(project_id) = project_id {
            query = query.filter("project_id", project_id);
        }

        match self.store.query(user_id, Collection::Pivots, &query).await {
            Ok(docs) => docs.iter().map(Pivot::from_document).collect(),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to list pivots");
                Vec::new()
            }
        }
    }

    pub async fn update_status(
        &self,
        user_id: &str,
        pivot_id: &str,
        status: PivotStatus,
    ) -> Result<Pivot, DomainError> {
        let doc = self
            .store
            .update(
                &DocPath::new(user_id, Collection::Pivots, pivot_id),
                fields(json!({ "status": status })),
            )
            .await
            .map_err(map_missing("pivot", pivot_id))?;
        Ok(Pivot::from_document(&doc))
    }
}
