use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::domain::{DocPath, Plan, UserProfile};
use crate::error::DomainError;
use crate::ports::{DocumentStore, VerifiedIdentity};

use super::fields;

pub struct UserService {
    store: Arc<dyn DocumentStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Merge the verified identity into the user profile.
    ///
    /// First-time users are assigned the starter plan; an existing plan is
    /// never overwritten.
    pub async fn sync(&self, identity: &VerifiedIdentity) -> Result<UserProfile, DomainError> {
        let path = DocPath::user(&identity.user_id);
        let mut doc = self
            .store
            .set(
                &path,
                fields(json!({
                    "email": identity.email,
                    "display_name": identity.name,
                    "photo_url": identity.picture,
                    "sign_in_provider": identity.sign_in_provider,
                    "last_login": Utc::now().to_rfc3339(),
                })),
                true,
            )
            .await?;

        if doc.get_str("plan").is_none() {
            doc = self
                .store
                .set(&path, fields(json!({ "plan": Plan::Starter })), true)
                .await?;
            tracing::info!(user_id = %identity.user_id, "New user assigned starter plan");
        }

        Ok(UserProfile::from_document(&doc))
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile, DomainError> {
        let doc = self
            .store
            .get(&DocPath::user(user_id))
            .await?
            .ok_or_else(|| DomainError::not_found("user", user_id))?;
        Ok(UserProfile::from_document(&doc))
    }
}
