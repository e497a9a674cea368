//! Bearer-token verification implementations.

mod firebase;
mod hmac;

pub use firebase::{FirebaseConfig, FirebaseTokenVerifier, GOOGLE_JWKS_URL};
pub use hmac::{HmacConfig, HmacTokenVerifier};
