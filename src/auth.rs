//! App token verification.
//!
//! The mobile app authenticates with a bearer JWT issued by the auth
//! provider. Verification yields the external subject id plus an optional
//! verified email; everything downstream (identity resolution, document
//! ownership) keys off that result, so the verifier sits behind a trait and
//! tests substitute a static one.

use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Outcome of verifying an app token: who logged in, as attested by the
/// auth provider.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// External subject id (the auth provider's uid). Never empty.
    pub uid: String,
    pub email: Option<String>,
    /// Whether the auth provider has verified ownership of `email`.
    pub email_verified: bool,
    /// Auth provider tag, e.g. "apple.com" or "password".
    pub provider: String,
}

pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<VerifiedIdentity>;
}

/// Custom claims carried by first-party app tokens. Standard claims
/// (sub, iat, exp) are handled by jwt-simple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppTokenClaims {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Verifies HS256 app tokens against the shared auth secret.
pub struct Hs256Verifier {
    key: HS256Key,
}

impl Hs256Verifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: HS256Key::from_bytes(secret.as_bytes()),
        }
    }
}

impl TokenVerifier for Hs256Verifier {
    fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
        let claims = self
            .key
            .verify_token::<AppTokenClaims>(token, None)
            .map_err(|e| {
                tracing::debug!("App token verification failed: {}", e);
                AppError::Unauthorized
            })?;

        let uid = claims
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AppError::Unauthorized)?
            .to_string();

        Ok(VerifiedIdentity {
            uid,
            email: claims.custom.email,
            email_verified: claims.custom.email_verified,
            provider: claims
                .custom
                .provider
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}
