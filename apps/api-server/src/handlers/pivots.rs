//! Pivot strategy endpoints.

use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;

use elemental_core::domain::PivotStatus;
use elemental_shared::dto::{PivotListQuery, PivotRequest, StatusUpdateRequest};

use super::client_key;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /pivots
pub async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<PivotRequest>,
) -> AppResult<HttpResponse> {
    let pivot = state
        .analysis
        .pivot(
            &client_key(&req),
            user.uid(),
            &body.project_id,
            &body.pivot_name,
            &body.currency,
        )
        .await?;
    Ok(HttpResponse::Created().json(json!({ "pivot": pivot })))
}

/// GET /pivots?project_id=
pub async fn list(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<PivotListQuery>,
) -> HttpResponse {
    let pivots = state
        .pivots
        .list(user.uid(), query.project_id.as_deref())
        .await;
    HttpResponse::Ok().json(json!({ "pivots": pivots }))
}

/// PATCH /pivots/{pivot_id}/status
pub async fn update_status(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
) -> AppResult<HttpResponse> {
    let status: PivotStatus = body.status.parse().map_err(AppError::Validation)?;
    let pivot = state.pivots.update_status(user.uid(), &path, status).await?;
    Ok(HttpResponse::Ok().json(json!({ "pivot": pivot })))
}
