//! Authenticated app endpoints: profile, routine, progress, streak,
//! bootstrap, and the subscription snapshot surface.

mod bootstrap;
mod profile;
mod progress;
mod routine;
mod streak;
mod subscription;

pub use bootstrap::*;
pub use profile::*;
pub use progress::*;
pub use routine::*;
pub use streak::*;
pub use subscription::*;

use axum::{
    routing::{get, post, put},
    Router,
};
use serde::Serialize;

use crate::state::AppState;

/// Standard acknowledgement body for upsert endpoints.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckResponse {
    pub ok: bool,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl AckResponse {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            ok: true,
            user_id: user_id.into(),
            date: None,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/user/profile", post(upsert_profile))
        .route("/v1/routines/current", put(upsert_routine))
        .route("/v1/progress/daily", post(upsert_daily_progress))
        .route("/v1/stats/streak/snapshot", post(upsert_streak))
        .route("/v1/bootstrap", get(get_bootstrap))
        .route("/v1/subscription", get(get_subscription))
        .route("/v1/subscription/snapshot", post(report_subscription_snapshot))
}
