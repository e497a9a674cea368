use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw document payload - a JSON object.
pub type Fields = serde_json::Map<String, Value>;

/// A stored document with server-assigned timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn get_u64(&self, field: &str) -> Option<u64> {
        self.fields.get(field).and_then(Value::as_u64)
    }
}

/// Per-user collections known to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// The user profile itself (`users/{uid}`).
    Users,
    Projects,
    Pivots,
    Alerts,
    Usage,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Projects => "projects",
            Collection::Pivots => "pivots",
            Collection::Alerts => "alerts",
            Collection::Usage => "usage",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a single document: `users/{uid}` or `users/{uid}/{collection}/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    pub user_id: String,
    pub collection: Collection,
    pub doc_id: String,
}

impl DocPath {
    pub fn new(
        user_id: impl Into<String>,
        collection: Collection,
        doc_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            collection,
            doc_id: doc_id.into(),
        }
    }

    /// Path of the user profile document.
    pub fn user(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            doc_id: user_id.clone(),
            user_id,
            collection: Collection::Users,
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.collection {
            Collection::Users => write!(f, "users/{}", self.user_id),
            other => write!(f, "users/{}/{}/{}", self.user_id, other, self.doc_id),
        }
    }
}
