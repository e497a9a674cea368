use actix_web::{HttpRequest, HttpResponse, web};

use elemental_shared::dto::DeconstructionRequest;

use super::client_key;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::error::AppResult;
use crate::observability::RequestId;
use crate::state::AppState;

/// POST /deconstruct
pub async fn deconstruct(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    request_id: RequestId,
    body: web::Json<DeconstructionRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    tracing::info!(
        request_id = %request_id.as_str(),
        user_id = %user.uid(),
        industry = ?body.industry,
        "Deconstruction requested"
    );

    let result = state
        .analysis
        .deconstruct(&client_key(&req), user.uid(), &body.idea, &body.currency)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}
