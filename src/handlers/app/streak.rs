use axum::extract::State;

use super::AckResponse;
use crate::error::Result;
use crate::extractors::{AuthedUser, Json};
use crate::models::StreakUpsert;
use crate::state::AppState;
use crate::store::paths;

/// POST /v1/stats/streak/snapshot — merge-upsert the client-computed
/// streak snapshot.
pub async fn upsert_streak(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(input): Json<StreakUpsert>,
) -> Result<Json<AckResponse>> {
    let collection = paths::stats(&user.canonical_user_id);
    state
        .store
        .merge_set(&collection, paths::STREAK_DOC, &input.into_document())?;
    Ok(Json(AckResponse::for_user(user.canonical_user_id)))
}
