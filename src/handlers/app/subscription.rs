use axum::extract::State;

use super::AckResponse;
use crate::error::Result;
use crate::extractors::{AuthedUser, Json};
use crate::models::SnapshotReport;
use crate::state::AppState;
use crate::store::Document;

/// GET /v1/subscription — the caller's current snapshot (`{}` when absent).
pub async fn get_subscription(
    State(state): State<AppState>,
    user: AuthedUser,
) -> Result<Json<Document>> {
    let snapshot = state.subscriptions().get_snapshot(&user.canonical_user_id)?;
    Ok(Json(snapshot))
}

/// POST /v1/subscription/snapshot — app-reported snapshot (client-side
/// receipt validation). Restricted to the allow-listed fields; never sets
/// `latestEventAt`, so webhook ordering is unaffected.
pub async fn report_subscription_snapshot(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(input): Json<SnapshotReport>,
) -> Result<Json<AckResponse>> {
    state
        .subscriptions()
        .report_snapshot(&user.canonical_user_id, input)?;
    Ok(Json(AckResponse::for_user(user.canonical_user_id)))
}
