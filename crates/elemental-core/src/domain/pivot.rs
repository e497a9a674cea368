use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::analysis::PivotAnalysis;
use super::document::Document;

/// Decision state of a pivot strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotStatus {
    #[default]
    Active,
    Implemented,
    Rejected,
    Paused,
}

impl PivotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PivotStatus::Active => "active",
            PivotStatus::Implemented => "implemented",
            PivotStatus::Rejected => "rejected",
            PivotStatus::Paused => "paused",
        }
    }
}

impl FromStr for PivotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PivotStatus::Active),
            "implemented" => Ok(PivotStatus::Implemented),
            "rejected" => Ok(PivotStatus::Rejected),
            "paused" => Ok(PivotStatus::Paused),
            other => Err(format!("unknown pivot status '{other}'")),
        }
    }
}

/// A pivot strategy explored for a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pivot {
    pub id: String,
    pub project_id: Option<String>,
    pub pivot_name: String,
    pub analysis: Option<PivotAnalysis>,
    pub status: PivotStatus,
    pub created_at: DateTime<Utc>,
}

impl Pivot {
    pub fn from_document(doc: &Document) -> Self {
        let analysis = doc
            .get("analysis")
            .cloned()
            .filter(|v| !v.is_null())
            .and_then(|v: Value| serde_json::from_value(v).ok());

        Self {
            id: doc.id.clone(),
            project_id: doc.get_str("project_id").map(String::from),
            pivot_name: doc.get_str("pivot_name").unwrap_or_default().to_string(),
            analysis,
            status: doc
                .get_str("status")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            created_at: doc.created_at,
        }
    }
}
