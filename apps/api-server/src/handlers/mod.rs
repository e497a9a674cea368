//! HTTP handlers and route configuration.

mod auth;
mod dashboard;
mod deconstruct;
mod health;
mod pivots;
mod projects;


use actix_web::{HttpRequest, web};

use crate::middleware::error::AppError;

/// Default page size for dashboard lists.
const DEFAULT_LIST_LIMIT: usize = 5;
const MAX_LIST_LIMIT: usize = 50;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health::root))
        .route("/health", web::get().to(health::health_check))
        .route("/auth/sync", web::post().to(auth::sync))
        .route("/deconstruct", web::post().to(deconstruct::deconstruct))
        .service(
            web::scope("/dashboard")
                .route("/stats", web::get().to(dashboard::stats))
                .route("/alerts", web::get().to(dashboard::alerts))
                .route("/alerts/{alert_id}/dismiss", web::post().to(dashboard::dismiss_alert))
                .route("/projects", web::get().to(dashboard::projects))
                .route("/growth", web::get().to(dashboard::growth)),
        )
        .service(
            web::scope("/projects")
                .route("/{project_id}", web::get().to(projects::get))
                .route("/{project_id}", web::delete().to(projects::delete))
                .route("/{project_id}/status", web::patch().to(projects::update_status))
                .route("/{project_id}/diagnose", web::post().to(projects::diagnose)),
        )
        .service(
            web::scope("/pivots")
                .route("", web::post().to(pivots::create))
                .route("", web::get().to(pivots::list))
                .route("/{pivot_id}/status", web::patch().to(pivots::update_status)),
        );
}

/// Malformed JSON bodies become RFC 7807 400 responses.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Key the rate limiter buckets this caller under.
fn client_key(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

fn list_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}
