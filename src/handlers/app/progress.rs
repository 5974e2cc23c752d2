use axum::extract::State;

use super::AckResponse;
use crate::error::Result;
use crate::extractors::{AuthedUser, Json};
use crate::models::DailyProgressUpsert;
use crate::state::AppState;
use crate::store::paths;

/// POST /v1/progress/daily — upsert one day's progress, keyed by date.
pub async fn upsert_daily_progress(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(input): Json<DailyProgressUpsert>,
) -> Result<Json<AckResponse>> {
    let (date, doc) = input.into_document()?;
    let collection = paths::progress(&user.canonical_user_id);
    state.store.merge_set(&collection, &date, &doc)?;

    let mut ack = AckResponse::for_user(user.canonical_user_id);
    ack.date = Some(date);
    Ok(Json(ack))
}
