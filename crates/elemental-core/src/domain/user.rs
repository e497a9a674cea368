use serde::Serialize;

use super::document::Document;

/// User profile stored at `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    /// Raw plan name; may be unset or unrecognized.
    pub plan: Option<String>,
    pub last_login: Option<String>,
}

impl UserProfile {
    pub fn from_document(doc: &Document) -> Self {
        let text = |field: &str| doc.get_str(field).map(String::from);
        Self {
            user_id: doc.id.clone(),
            email: text("email"),
            display_name: text("display_name"),
            photo_url: text("photo_url"),
            plan: text("plan"),
            last_login: text("last_login"),
        }
    }
}
