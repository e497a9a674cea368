//! Dashboard read endpoints.

use actix_web::{HttpResponse, web};
use serde_json::json;

use elemental_shared::dto::ListQuery;

use super::list_limit;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /dashboard/stats
pub async fn stats(state: web::Data<AppState>, user: AuthenticatedUser) -> HttpResponse {
    let (stats, usage) = futures::join!(
        state.dashboard.stats(user.uid()),
        state.dashboard.usage(user.uid())
    );
    HttpResponse::Ok().json(json!({ "stats": stats, "usage": usage }))
}

/// GET /dashboard/alerts?limit=
pub async fn alerts(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<ListQuery>,
) -> HttpResponse {
    let alerts = state.alerts.active(user.uid(), list_limit(query.limit)).await;
    HttpResponse::Ok().json(json!({ "alerts": alerts }))
}

/// POST /dashboard/alerts/{alert_id}/dismiss
pub async fn dismiss_alert(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    state.alerts.dismiss(user.uid(), &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// GET /dashboard/projects?limit=
pub async fn projects(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<ListQuery>,
) -> HttpResponse {
    let projects = state
        .projects
        .recent(user.uid(), list_limit(query.limit))
        .await;
    HttpResponse::Ok().json(json!({ "projects": projects }))
}

/// GET /dashboard/growth
pub async fn growth(state: web::Data<AppState>, user: AuthenticatedUser) -> HttpResponse {
    let growth = state.dashboard.growth(user.uid()).await;
    HttpResponse::Ok().json(json!({ "growth": growth }))
}
