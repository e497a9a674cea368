use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Info,
    Success,
}

/// Dashboard alert raised from project analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub project_id: Option<String>,
    pub dismissed: bool,
    pub created_at: DateTime<Utc>,
}

/// An alert that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAlert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub project_id: Option<String>,
}

impl Alert {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            kind: doc
                .get("type")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or(AlertKind::Info),
            title: doc.get_str("title").unwrap_or_default().to_string(),
            message: doc.get_str("message").unwrap_or_default().to_string(),
            project_id: doc.get_str("project_id").map(String::from),
            dismissed: doc
                .get("dismissed")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false),
            created_at: doc.created_at,
        }
    }
}
