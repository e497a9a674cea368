use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::analysis::{DeconstructionResult, Diagnosis};
use super::document::{Document, Fields};

/// Lifecycle state of a saved project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProjectStatus::Active),
            "paused" => Ok(ProjectStatus::Paused),
            "completed" => Ok(ProjectStatus::Completed),
            "archived" => Ok(ProjectStatus::Archived),
            other => Err(format!("unknown project status '{other}'")),
        }
    }
}

/// A revenue stream derived from one business element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueStream {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub monetization_potential: String,
    /// 0-100. Streams saved before scores existed read as 100.
    #[serde(default = "default_strength_score")]
    pub strength_score: u32,
}

fn default_strength_score() -> u32 {
    100
}

/// Map a monetization label ("High", "Medium", ...) onto a 0-100 score.
pub fn strength_from_potential(potential: &str) -> u32 {
    match potential.trim().to_ascii_lowercase().as_str() {
        "very high" => 95,
        "high" => 85,
        "medium" => 60,
        "low" => 35,
        _ => 50,
    }
}

/// Saved business project, normalized from its stored document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub original_idea: String,
    pub cheapest_entry_point: String,
    pub estimated_cost: Option<String>,
    pub time_to_validate: Option<String>,
    pub currency: String,
    pub overall_score: u32,
    pub revenue_streams: Vec<RevenueStream>,
    pub revenue_streams_count: usize,
    pub status: ProjectStatus,
    pub diagnosis: Option<Diagnosis>,
    pub analysis: Option<DeconstructionResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Loose view over whatever a project document happens to contain.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredProject {
    name: Option<String>,
    original_idea: Option<String>,
    cheapest_entry_point: Option<String>,
    estimated_cost: Option<String>,
    time_to_validate: Option<String>,
    currency: Option<String>,
    overall_score: Option<f64>,
    revenue_streams: Vec<RevenueStream>,
    revenue_streams_count: Option<usize>,
    status: Option<String>,
    diagnosis: Option<Diagnosis>,
    analysis: Option<DeconstructionResult>,
}

const NAME_MAX_CHARS: usize = 60;

impl Project {
    /// Normalize a stored document into a typed project.
    ///
    /// Missing or malformed fields fall back to defaults here, once, so the
    /// rest of the code never probes raw fields.
    pub fn from_document(doc: &Document) -> Self {
        let stored: StoredProject = serde_json::from_value(Value::Object(doc.fields.clone()))
            .unwrap_or_else(|e| {
                tracing::warn!(project_id = %doc.id, error = %e, "Malformed project document");
                StoredProject {
                    name: doc.get_str("name").map(String::from),
                    original_idea: doc.get_str("original_idea").map(String::from),
                    status: doc.get_str("status").map(String::from),
                    ..Default::default()
                }
            });

        let original_idea = stored.original_idea.unwrap_or_default();
        let status = match stored.status.as_deref() {
            None => ProjectStatus::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(project_id = %doc.id, status = raw, "Unknown project status");
                ProjectStatus::default()
            }),
        };

        Self {
            id: doc.id.clone(),
            name: stored
                .name
                .unwrap_or_else(|| project_name(&original_idea)),
            cheapest_entry_point: stored.cheapest_entry_point.unwrap_or_default(),
            estimated_cost: stored.estimated_cost,
            time_to_validate: stored.time_to_validate,
            currency: stored.currency.unwrap_or_else(|| "USD".to_string()),
            overall_score: stored
                .overall_score
                .map(|s| s.clamp(0.0, 100.0).round() as u32)
                .unwrap_or(0),
            revenue_streams_count: stored
                .revenue_streams_count
                .unwrap_or(stored.revenue_streams.len()),
            revenue_streams: stored.revenue_streams,
            status,
            diagnosis: stored.diagnosis,
            analysis: stored.analysis,
            original_idea,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }

    /// Document fields for a project created from a fresh deconstruction.
    pub fn fields_from_analysis(result: &DeconstructionResult) -> Fields {
        let streams: Vec<RevenueStream> = result
            .elements
            .iter()
            .map(|e| RevenueStream {
                name: e.name.clone(),
                kind: e.kind.clone(),
                description: e.description.clone(),
                monetization_potential: e.monetization_potential.clone(),
                strength_score: strength_from_potential(&e.monetization_potential),
            })
            .collect();

        let value = json!({
            "name": project_name(&result.original_idea),
            "original_idea": result.original_idea,
            "cheapest_entry_point": result.cheapest_entry_point,
            "estimated_cost": result.estimated_cost,
            "time_to_validate": result.time_to_validate,
            "currency": result.currency.as_deref().unwrap_or("USD"),
            "overall_score": result.overall_score.unwrap_or(0),
            "revenue_streams_count": streams.len(),
            "revenue_streams": streams,
            "status": ProjectStatus::Active,
            "analysis": result,
        });

        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }
}

fn project_name(idea: &str) -> String {
    let trimmed = idea.trim();
    if trimmed.is_empty() {
        return "Your idea".to_string();
    }
    trimmed.chars().take(NAME_MAX_CHARS).collect()
}
