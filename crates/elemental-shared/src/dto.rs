//! Data Transfer Objects - request/response bodies for the API.

use serde::{Deserialize, Serialize};

fn default_currency() -> String {
    "USD".to_string()
}

/// Request to break a business idea into its elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeconstructionRequest {
    pub idea: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// Request to analyze a pivot for an existing project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotRequest {
    pub project_id: String,
    pub pivot_name: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnoseRequest {
    pub challenges: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// Status transition for a project or a pivot. Values are checked by the
/// handler so an unknown status maps to 422 rather than a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotListQuery {
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
