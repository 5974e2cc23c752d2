use axum::extract::State;

use super::AckResponse;
use crate::error::Result;
use crate::extractors::{AuthedUser, Json};
use crate::models::ProfileUpsert;
use crate::state::AppState;
use crate::store::paths;

/// POST /v1/user/profile — merge-upsert the allow-listed profile fields.
pub async fn upsert_profile(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(input): Json<ProfileUpsert>,
) -> Result<Json<AckResponse>> {
    let collection = paths::profile(&user.canonical_user_id);
    state
        .store
        .merge_set(&collection, paths::PROFILE_DOC, &input.into_document())?;
    Ok(Json(AckResponse::for_user(user.canonical_user_id)))
}
