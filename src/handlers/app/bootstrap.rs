use axum::extract::State;
use serde::Serialize;

use crate::error::Result;
use crate::extractors::{AuthedUser, Json};
use crate::state::AppState;
use crate::store::{paths, Document};
use crate::util::today_utc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapResponse {
    pub user_id: String,
    pub profile: Document,
    pub routine: Document,
    pub streak: Document,
    pub progress: BootstrapProgress,
    pub subscription: Document,
}

#[derive(Serialize)]
pub struct BootstrapProgress {
    pub today: Document,
}

/// GET /v1/bootstrap — everything the app needs to render its first
/// screen, in one round trip. Absent documents come back as `{}`.
pub async fn get_bootstrap(
    State(state): State<AppState>,
    user: AuthedUser,
) -> Result<Json<BootstrapResponse>> {
    let uid = &user.canonical_user_id;
    let store = &state.store;

    let profile = store
        .get(&paths::profile(uid), paths::PROFILE_DOC)?
        .unwrap_or_default();
    let routine = store
        .get(&paths::routine(uid), paths::ROUTINE_DOC)?
        .unwrap_or_default();
    let streak = store
        .get(&paths::stats(uid), paths::STREAK_DOC)?
        .unwrap_or_default();
    let today = store
        .get(&paths::progress(uid), &today_utc())?
        .unwrap_or_default();
    let subscription = state.subscriptions().get_snapshot(uid)?;

    Ok(Json(BootstrapResponse {
        user_id: user.canonical_user_id,
        profile,
        routine,
        streak,
        progress: BootstrapProgress { today },
        subscription,
    }))
}
