use axum::extract::State;

use super::AckResponse;
use crate::error::Result;
use crate::extractors::{AuthedUser, Json};
use crate::models::RoutineUpsert;
use crate::state::AppState;
use crate::store::paths;

/// PUT /v1/routines/current — merge-upsert the user's single routine.
/// A non-array `tasks` value is rejected at deserialization (400).
pub async fn upsert_routine(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(input): Json<RoutineUpsert>,
) -> Result<Json<AckResponse>> {
    let collection = paths::routine(&user.canonical_user_id);
    state
        .store
        .merge_set(&collection, paths::ROUTINE_DOC, &input.into_document())?;
    Ok(Json(AckResponse::for_user(user.canonical_user_id)))
}
