use std::sync::Arc;

use serde_json::json;

use crate::domain::{
    Collection, DeconstructionResult, Diagnosis, DocPath, Project, ProjectStatus,
};
use crate::error::DomainError;
use crate::ports::{DocumentStore, Query, ResponseCache, SortKey};

use super::{fields, map_missing};

/// Saved projects, read through the response cache.
///
/// Every mutation invalidates the cached entry before returning.
pub struct ProjectService {
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn ResponseCache>,
}

impl ProjectService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<dyn ResponseCache>) -> Self {
        Self { store, cache }
    }

    fn path(user_id: &str, project_id: &str) -> DocPath {
        DocPath::new(user_id, Collection::Projects, project_id)
    }

    pub async fn get(&self, user_id: &str, project_id: &str) -> Result<Project, DomainError> {
        if let Some(doc) = self.cache.get(user_id, project_id).await {
            tracing::debug!(user_id = %user_id, project_id = %project_id, "Project cache hit");
            return Ok(Project::from_document(&doc));
        }

        let generation = self.cache.generation(user_id, project_id).await;
        let doc = self
            .store
            .get(&Self::path(user_id, project_id))
            .await?
            .ok_or_else(|| DomainError::not_found("project", project_id))?;

        match self.cache.put(user_id, project_id, &doc, generation).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(project_id = %project_id, "Project changed during read, not cached");
            }
            Err(e) => {
                tracing::warn!(project_id = %project_id, error = %e, "Failed to cache project");
            }
        }

        Ok(Project::from_document(&doc))
    }

    pub async fn create_from_analysis(
        &self,
        user_id: &str,
        result: &DeconstructionResult,
    ) -> Result<Project, DomainError> {
        let doc = self
            .store
            .create(
                user_id,
                Collection::Projects,
                Project::fields_from_analysis(result),
            )
            .await?;

        tracing::info!(user_id = %user_id, project_id = %doc.id, "Project created");
        Ok(Project::from_document(&doc))
    }

    pub async fn delete(&self, user_id: &str, project_id: &str) -> Result<(), DomainError> {
        let path = Self::path(user_id, project_id);
        if self.store.get(&path).await?.is_none() {
            return Err(DomainError::not_found("project", project_id));
        }

        self.store.delete(&path).await?;
        self.cache.invalidate(user_id, project_id).await?;

        tracing::info!(user_id = %user_id, project_id = %project_id, "Project deleted");
        Ok(())
    }

    pub async fn update_status(
        &self,
        user_id: &str,
        project_id: &str,
        status: ProjectStatus,
    ) -> Result<Project, DomainError> {
        let doc = self
            .store
            .update(
                &Self::path(user_id, project_id),
                fields(json!({ "status": status })),
            )
            .await
            .map_err(map_missing("project", project_id))?;
        self.cache.invalidate(user_id, project_id).await?;

        Ok(Project::from_document(&doc))
    }

    pub async fn record_diagnosis(
        &self,
        user_id: &str,
        project_id: &str,
        diagnosis: &Diagnosis,
    ) -> Result<Project, DomainError> {
        let doc = self
            .store
            .update(
                &Self::path(user_id, project_id),
                fields(json!({ "diagnosis": diagnosis })),
            )
            .await
            .map_err(map_missing("project", project_id))?;
        self.cache.invalidate(user_id, project_id).await?;

        Ok(Project::from_document(&doc))
    }

    /// Most recently updated projects. Empty when the store is unreachable.
    pub async fn recent(&self, user_id: &str, limit: usize) -> Vec<Project> {
        let query = Query::new().order_by(SortKey::UpdatedAt, true).limit(limit);
        match self.store.query(user_id, Collection::Projects, &query).await {
            Ok(docs) => docs.iter().map(Project::from_document).collect(),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to list projects");
                Vec::new()
            }
        }
    }
}
