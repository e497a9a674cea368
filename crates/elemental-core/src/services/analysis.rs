use std::sync::Arc;

use crate::admission::AdmissionController;
use crate::domain::{DeconstructionResult, Diagnosis, Pivot};
use crate::error::DomainError;
use crate::ports::IdeaAnalyzer;

use super::{AlertService, PivotService, ProjectService};

pub const MAX_IDEA_CHARS: usize = 2_000;

/// LLM-backed operations guarded by admission control.
///
/// Lookups that can 404 run before admission so a missing project never
/// costs the caller a generation.
pub struct AnalysisService {
    admission: Arc<AdmissionController>,
    analyzer: Arc<dyn IdeaAnalyzer>,
    projects: Arc<ProjectService>,
    alerts: Arc<AlertService>,
    pivots: Arc<PivotService>,
}

impl AnalysisService {
    pub fn new(
        admission: Arc<AdmissionController>,
        analyzer: Arc<dyn IdeaAnalyzer>,
        projects: Arc<ProjectService>,
        alerts: Arc<AlertService>,
        pivots: Arc<PivotService>,
    ) -> Self {
        Self {
            admission,
            analyzer,
            projects,
            alerts,
            pivots,
        }
    }

    /// Deconstruct an idea and save it as a new project.
    pub async fn deconstruct(
        &self,
        client_key: &str,
        user_id: &str,
        idea: &str,
        currency: &str,
    ) -> Result<DeconstructionResult, DomainError> {
        let idea = validate_text("idea", idea)?;
        let ticket = self.admission.admit(client_key, user_id).await?;

        let mut result = self.analyzer.deconstruct(idea, currency).await?;
        result.currency.get_or_insert_with(|| currency.to_string());

        let project = self.projects.create_from_analysis(user_id, &result).await?;
        match self.alerts.raise_for_project(user_id, &project).await {
            Ok(ids) if !ids.is_empty() => {
                tracing::debug!(project_id = %project.id, count = ids.len(), "Alerts raised");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(project_id = %project.id, error = %e, "Failed to raise alerts");
            }
        }

        tracing::info!(
            user_id = %user_id,
            project_id = %project.id,
            usage = ?ticket.usage_after,
            limit = ticket.limit,
            "Idea deconstructed"
        );
        result.project_id = Some(project.id);
        Ok(result)
    }

    /// Analyze a pivot for an existing project and save it.
    pub async fn pivot(
        &self,
        client_key: &str,
        user_id: &str,
        project_id: &str,
        pivot_name: &str,
        currency: &str,
    ) -> Result<Pivot, DomainError> {
        let pivot_name = validate_text("pivot_name", pivot_name)?;
        let project = self.projects.get(user_id, project_id).await?;
        self.admission.admit(client_key, user_id).await?;

        let analysis = self
            .analyzer
            .analyze_pivot(&project.original_idea, pivot_name, currency)
            .await?;
        self.pivots
            .create(user_id, project_id, pivot_name, &analysis)
            .await
    }

    /// Diagnose a struggling project and record the result on it.
    pub async fn diagnose(
        &self,
        client_key: &str,
        user_id: &str,
        project_id: &str,
        challenges: &str,
        currency: &str,
    ) -> Result<Diagnosis, DomainError> {
        let challenges = validate_text("challenges", challenges)?;
        let project = self.projects.get(user_id, project_id).await?;
        self.admission.admit(client_key, user_id).await?;

        let diagnosis = self
            .analyzer
            .diagnose(&project.original_idea, challenges, currency)
            .await?;
        self.projects
            .record_diagnosis(user_id, project_id, &diagnosis)
            .await?;
        Ok(diagnosis)
    }
}

fn validate_text<'a>(field: &str, value: &'a str) -> Result<&'a str, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > MAX_IDEA_CHARS {
        return Err(DomainError::Validation(format!(
            "{field} must be at most {MAX_IDEA_CHARS} characters"
        )));
    }
    Ok(trimmed)
}
