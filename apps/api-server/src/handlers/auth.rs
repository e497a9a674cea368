//! Authentication handlers.

use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /auth/sync - upsert the caller's profile from their token claims.
pub async fn sync(state: web::Data<AppState>, user: AuthenticatedUser) -> AppResult<HttpResponse> {
    let profile = state.users.sync(user.identity()).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "success", "user": profile })))
}
