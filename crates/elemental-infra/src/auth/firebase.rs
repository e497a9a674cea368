//! Firebase ID token verification against Google's published signing keys.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use parking_lot::RwLock;
use serde::Deserialize;

use elemental_core::ports::{AuthError, IdentityVerifier, VerifiedIdentity};

pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub jwks_url: String,
    pub http_timeout: Duration,
    /// Key cache lifetime when the JWKS response carries no `max-age`.
    pub default_keys_max_age: Duration,
}

impl FirebaseConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            http_timeout: Duration::from_secs(5),
            default_keys_max_age: Duration::from_secs(3600),
        }
    }

    /// `None` when `FIREBASE_PROJECT_ID` is unset.
    pub fn from_env() -> Option<Self> {
        let project_id = std::env::var("FIREBASE_PROJECT_ID")
            .ok()
            .filter(|s| !s.trim().is_empty())?;

        let mut config = Self::new(project_id);
        if let Ok(url) = std::env::var("FIREBASE_JWKS_URL") {
            config.jwks_url = url;
        }
        Some(config)
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    firebase: Option<FirebaseInfo>,
}

#[derive(Debug, Deserialize)]
struct FirebaseInfo {
    #[serde(default)]
    sign_in_provider: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    expires_at: Instant,
}

/// Verifies RS256 Firebase ID tokens.
///
/// Signing keys are cached for the `max-age` Google advertises and
/// refetched early when a token names an unknown key id.
pub struct FirebaseTokenVerifier {
    config: FirebaseConfig,
    http: reqwest::Client,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseTokenVerifier {
    pub fn new(config: FirebaseConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        tracing::info!(project_id = %config.project_id, "Firebase token verification enabled");

        Ok(Self {
            config,
            http,
            keys: RwLock::new(None),
        })
    }

    fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let guard = self.keys.read();
        let cached = guard.as_ref().filter(|c| c.expires_at > Instant::now())?;
        let jwk = cached.keys.find(kid)?;
        DecodingKey::from_jwk(jwk).ok()
    }

    async fn refresh_keys(&self) -> Result<(), AuthError> {
        let response = self
            .http
            .get(&self.config.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let max_age = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(self.config.default_keys_max_age);

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        tracing::debug!(keys = keys.keys.len(), max_age_secs = max_age.as_secs(), "Fetched signing keys");
        *self.keys.write() = Some(CachedKeys {
            keys,
            expires_at: Instant::now() + max_age,
        });
        Ok(())
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.cached_key(kid) {
            return Ok(key);
        }
        self.refresh_keys().await?;
        self.cached_key(kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown signing key '{kid}'")))
    }
}

fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl IdentityVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("missing key id".to_string()))?;
        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.config.project_id]);
        validation.set_issuer(&[self.config.issuer()]);

        let data = decode::<FirebaseClaims>(token, &key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }

        Ok(VerifiedIdentity {
            user_id: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
            sign_in_provider: claims.firebase.and_then(|f| f.sign_in_provider),
        })
    }
}
