//! Liveness endpoints.

use actix_web::HttpResponse;

use elemental_shared::dto::{HealthResponse, StatusResponse};

/// GET /
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        message: "Elemental AI System Online".to_string(),
        status: "active".to_string(),
    })
}

/// GET /health
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
