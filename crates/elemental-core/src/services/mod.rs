//! Application services composing the ports into request-level operations.

mod alerts;
mod analysis;
mod dashboard;
mod pivots;
mod projects;
mod users;

pub use alerts::{AlertService, alerts_for_project};
pub use analysis::{AnalysisService, MAX_IDEA_CHARS};
pub use dashboard::DashboardService;
pub use pivots::PivotService;
pub use projects::ProjectService;
pub use users::UserService;

use crate::error::{DomainError, StoreError};

/// Map a store miss on a known entity onto `DomainError::NotFound`.
pub(crate) fn map_missing(entity_type: &'static str, id: &str) -> impl FnOnce(StoreError) -> DomainError {
    let id = id.to_string();
    move |err| match err {
        StoreError::NotFound => DomainError::not_found(entity_type, id),
        other => DomainError::Store(other),
    }
}

/// Wrap a JSON object literal as document fields.
pub(crate) fn fields(value: serde_json::Value) -> crate::domain::Fields {
    match value {
        serde_json::Value::Object(map) => map,
        _ => crate::domain::Fields::new(),
    }
}
