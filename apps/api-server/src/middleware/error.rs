//! Error handling middleware - RFC 7807 compliant responses.

use std::fmt;
use std::time::Duration;

use actix_web::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use actix_web::{HttpResponse, ResponseError, http::StatusCode};

use elemental_core::ports::AuthError;
use elemental_core::{AdmissionError, DomainError};
use elemental_shared::ErrorResponse;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Validation(String),
    Unauthorized(AuthError),
    QuotaExceeded { plan: String, used: u64, limit: u64 },
    RateLimited { retry_after: Duration },
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation failed: {}", msg),
            AppError::Unauthorized(err) => write!(f, "Unauthorized: {}", err),
            AppError::QuotaExceeded { plan, used, limit } => {
                write!(f, "Quota exceeded on plan {} ({}/{})", plan, used, limit)
            }
            AppError::RateLimited { retry_after } => {
                write!(f, "Rate limited for {}s", retry_after_secs(*retry_after))
            }
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Whole seconds to advertise in `Retry-After`, never zero.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Validation(detail) => ErrorResponse::unprocessable(detail),
            AppError::Unauthorized(err) => match err {
                AuthError::MissingAuth => ErrorResponse::unauthorized(
                    "Please provide a valid Bearer token in the Authorization header.",
                ),
                AuthError::TokenExpired => ErrorResponse::unauthorized(
                    "Your authentication token has expired. Please sign in again.",
                ),
                AuthError::InvalidToken(_) | AuthError::Provider(_) => {
                    ErrorResponse::unauthorized("Invalid token")
                }
            },
            AppError::QuotaExceeded { .. } => ErrorResponse::quota_exceeded(
                "AI generation limit reached for your plan. Upgrade to Pro for more.",
            ),
            AppError::RateLimited { retry_after } => {
                ErrorResponse::too_many_requests(retry_after_secs(*retry_after))
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
        };

        let mut response = HttpResponse::build(self.status_code());
        if let AppError::RateLimited { retry_after } = self {
            response.insert_header((RETRY_AFTER, retry_after_secs(*retry_after).to_string()));
            response.insert_header((
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from_static("0"),
            ));
        }
        response.json(error)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        if let AuthError::Provider(msg) = &err {
            tracing::error!("Identity provider error: {}", msg);
        }
        AppError::Unauthorized(err)
    }
}

impl From<AdmissionError> for AppError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::RateLimited { retry_after } => AppError::RateLimited { retry_after },
            AdmissionError::QuotaExceeded { plan, used, limit } => {
                AppError::QuotaExceeded { plan, used, limit }
            }
            AdmissionError::StoreUnavailable(msg) => AppError::Internal(msg),
        }
    }
}

// Conversion from domain errors
impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, id } => {
                AppError::NotFound(format!("{} with id {} not found", entity_type, id))
            }
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Admission(err) => err.into(),
            DomainError::Analysis(err) => AppError::Internal(format!("Analysis failed: {}", err)),
            DomainError::Store(err) => AppError::Internal(format!("Store error: {}", err)),
            DomainError::Cache(err) => AppError::Internal(format!("Cache error: {}", err)),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
