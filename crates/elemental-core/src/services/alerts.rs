use std::sync::Arc;

use serde_json::json;

use crate::domain::{Alert, AlertKind, Collection, DocPath, NewAlert, Project};
use crate::error::DomainError;
use crate::ports::{DocumentStore, Query, SortKey};

use super::{fields, map_missing};

const LOW_STRENGTH: u32 = 50;
const MAX_LOW_STRENGTH_STREAMS: usize = 3;
const STRONG_SCORE: u32 = 85;

/// Alerts raised by a freshly analyzed project.
pub fn alerts_for_project(project: &Project) -> Vec<NewAlert> {
    let mut alerts = Vec::new();
    let name = &project.name;
    let project_id = Some(project.id.clone());

    let has_distribution = project.revenue_streams.iter().any(|s| {
        let lower = s.name.to_lowercase();
        lower.contains("marketplace") || lower.contains("platform")
    });
    if !has_distribution {
        alerts.push(NewAlert {
            kind: AlertKind::Warning,
            title: "Distribution Strategy Needed".to_string(),
            message: format!(
                "Your idea \"{name}\" may be weak on distribution channels. \
                 Consider adding marketplace or platform strategies."
            ),
            project_id: project_id.clone(),
        });
    }

    let weak_streams = project
        .revenue_streams
        .iter()
        .filter(|s| s.strength_score < LOW_STRENGTH)
        .count();
    if weak_streams > MAX_LOW_STRENGTH_STREAMS {
        alerts.push(NewAlert {
            kind: AlertKind::Info,
            title: "Revenue Model Optimization".to_string(),
            message: format!(
                "Several revenue streams in \"{name}\" scored below {LOW_STRENGTH}. \
                 Focus on your strongest 2-3 streams for better results."
            ),
            project_id: project_id.clone(),
        });
    }

    if project.overall_score >= STRONG_SCORE {
        alerts.push(NewAlert {
            kind: AlertKind::Success,
            title: "Strong Business Model Detected".to_string(),
            message: format!(
                "Excellent! \"{name}\" has a robust revenue model with {}% viability score.",
                project.overall_score
            ),
            project_id,
        });
    }

    alerts
}

pub struct AlertService {
    store: Arc<dyn DocumentStore>,
}

impl AlertService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Store the alerts a project triggers. Returns the new alert ids.
    pub async fn raise_for_project(
        &self,
        user_id: &str,
        project: &Project,
    ) -> Result<Vec<String>, DomainError> {
        let mut ids = Vec::new();
        for alert in alerts_for_project(project) {
            let doc = self
                .store
                .create(
                    user_id,
                    Collection::Alerts,
                    fields(json!({
                        "type": alert.kind,
                        "title": alert.title,
                        "message": alert.message,
                        "project_id": alert.project_id,
                        "dismissed": false,
                    })),
                )
                .await?;
            ids.push(doc.id);
        }
        Ok(ids)
    }

    /// Newest non-dismissed alerts. Empty when the store is unreachable.
    pub async fn active(&self, user_id: &str, limit: usize) -> Vec<Alert> {
        let query = Query::new()
            .filter("dismissed", false)
            .order_by(SortKey::CreatedAt, true)
            .limit(limit);

        match self.store.query(user_id, Collection::Alerts, &query).await {
            Ok(docs) => docs.iter().map(Alert::from_document).collect(),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to list alerts");
                Vec::new()
            }
        }
    }

    pub async fn dismiss(&self, user_id: &str, alert_id: &str) -> Result<(), DomainError> {
        self.store
            .update(
                &DocPath::new(user_id, Collection::Alerts, alert_id),
                fields(json!({ "dismissed": true })),
            )
            .await
            .map_err(map_missing("alert", alert_id))?;
        Ok(())
    }
}
