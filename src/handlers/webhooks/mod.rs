pub mod revenuecat;

pub use revenuecat::handle_revenuecat_webhook;

use axum::{routing::post, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/webhooks/revenuecat", post(handle_revenuecat_webhook))
}
