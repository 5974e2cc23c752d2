//! Custom extractors that return JSON errors instead of plain text.

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::auth::VerifiedIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// JSON extractor that returns `AppError` on failure.
///
/// Use this instead of `axum::Json` to get JSON error responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let result = axum::Json::<T>::from_request(req, state).await?;
        Ok(Json(result.0))
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// The authenticated caller, with identity already canonicalized.
///
/// Verifies the bearer app token, then resolves the external uid (plus
/// verified email, if any) to the canonical user id every document path
/// keys off. Rejection is always a 401 without store access; resolution
/// failures after a verified token are the resolver's to report.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub canonical_user_id: String,
    pub uid: String,
    pub email: Option<String>,
}

impl FromRequestParts<AppState> for AuthedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let login: VerifiedIdentity = match bearer {
            Some(token) => state.verifier.verify(token)?,
            None => {
                // Developer fallback for local testing before auth wiring
                // is complete.
                let dev_uid = state
                    .allow_dev_user_header
                    .then(|| parts.headers.get("x-user-id"))
                    .flatten()
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|s| !s.is_empty());
                match dev_uid {
                    Some(uid) => VerifiedIdentity {
                        uid: uid.to_string(),
                        email: None,
                        email_verified: false,
                        provider: "dev_header".to_string(),
                    },
                    None => return Err(AppError::Unauthorized),
                }
            }
        };

        let canonical_user_id = state.identity().resolve(&login)?;
        Ok(AuthedUser {
            canonical_user_id,
            uid: login.uid,
            email: login.email,
        })
    }
}
