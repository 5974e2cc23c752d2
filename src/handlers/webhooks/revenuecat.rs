//! RevenueCat webhook ingress.
//!
//! Authenticates the call with the shared-secret bearer token (compared in
//! constant time), normalizes the event, resolves the canonical user id,
//! and drives the subscription state machine. Duplicates and out-of-order
//! events are success responses — the provider must never see a retriable
//! failure for conditions that are not errors.

use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::Serialize;
use serde_json::Value;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::payments::revenuecat::normalize;
use crate::payments::IngestOutcome;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub status: &'static str,
    pub event_id: String,
    pub user_id: String,
}

pub async fn handle_revenuecat_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<WebhookResponse>> {
    authorize(&headers, &state.revenuecat_webhook_token)?;

    let mut event = normalize(&body)?;
    event.app_user_id = state
        .identity()
        .canonical_for_app_user_id(&event.raw_app_user_id);

    let outcome = state.subscriptions().apply_webhook_event(&event)?;
    if outcome == IngestOutcome::Applied {
        tracing::debug!(
            "RevenueCat event accepted: id={}, raw_user={}, canonical={}",
            event.event_id,
            event.raw_app_user_id,
            event.app_user_id
        );
    }

    Ok(Json(WebhookResponse {
        status: outcome.as_str(),
        event_id: event.event_id,
        user_id: event.app_user_id,
    }))
}

/// Constant-time bearer comparison. An unset server token rejects
/// everything rather than leaving the endpoint open.
fn authorize(headers: &HeaderMap, expected: &str) -> Result<()> {
    if expected.is_empty() {
        tracing::error!("REVENUECAT_WEBHOOK_TOKEN is not configured; rejecting webhook");
        return Err(AppError::Unauthorized);
    }

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AppError::Unauthorized)?;

    if provided.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}
