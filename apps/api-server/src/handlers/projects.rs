//! Project endpoints.

use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;

use elemental_core::domain::ProjectStatus;
use elemental_shared::dto::{DiagnoseRequest, StatusUpdateRequest};

use super::client_key;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /projects/{project_id}
pub async fn get(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let project = state.projects.get(user.uid(), &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "project": project })))
}

/// DELETE /projects/{project_id}
pub async fn delete(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    state.projects.delete(user.uid(), &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// PATCH /projects/{project_id}/status
pub async fn update_status(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
) -> AppResult<HttpResponse> {
    let status: ProjectStatus = body.status.parse().map_err(AppError::Validation)?;
    let project = state
        .projects
        .update_status(user.uid(), &path, status)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "project": project })))
}

/// POST /projects/{project_id}/diagnose
pub async fn diagnose(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<DiagnoseRequest>,
) -> AppResult<HttpResponse> {
    let diagnosis = state
        .analysis
        .diagnose(
            &client_key(&req),
            user.uid(),
            &path,
            &body.challenges,
            &body.currency,
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "diagnosis": diagnosis })))
}
