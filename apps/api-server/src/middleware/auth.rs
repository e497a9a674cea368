//! Authentication extractor.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use futures::future::LocalBoxFuture;

use elemental_core::ports::{AuthError, VerifiedIdentity};

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Caller identity verified from the `Authorization: Bearer` header.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(user: AuthenticatedUser) -> impl Responder {
///     format!("Hello, user {}!", user.uid())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub VerifiedIdentity);

impl AuthenticatedUser {
    pub fn uid(&self) -> &str {
        &self.0.user_id
    }

    pub fn identity(&self) -> &VerifiedIdentity {
        &self.0
    }
}

fn bearer_token(req: &HttpRequest) -> Result<String, AuthError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;
    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AuthError::InvalidToken("Expected Bearer token".to_string())),
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let verifier = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.verifier.clone());
        let token = bearer_token(req);

        Box::pin(async move {
            let Some(verifier) = verifier else {
                return Err(AppError::Internal("AppState not found in app data".to_string()));
            };

            let identity = verifier.verify(&token?).await.map_err(|e| {
                tracing::warn!(error = %e, "Token verification failed");
                e
            })?;
            Ok(AuthenticatedUser(identity))
        })
    }
}
