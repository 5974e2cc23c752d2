//! Test utilities and fixtures for Momentum API integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use jwt_simple::prelude::*;
use serde_json::Value;
use tower::ServiceExt;

use momentum_api::auth::{AppTokenClaims, Hs256Verifier};
use momentum_api::handlers;
use momentum_api::state::AppState;
use momentum_api::store::{DocumentStore, MemoryStore};

pub const TEST_AUTH_SECRET: &str = "test-auth-secret";
pub const TEST_WEBHOOK_TOKEN: &str = "whk_test_token";

/// Fresh in-memory state with the HS256 verifier wired to the test secret.
pub fn test_state() -> AppState {
    AppState {
        store: Arc::new(MemoryStore::new()),
        verifier: Arc::new(Hs256Verifier::new(TEST_AUTH_SECRET)),
        revenuecat_webhook_token: TEST_WEBHOOK_TOKEN.to_string(),
        allow_dev_user_header: false,
    }
}

pub fn app(state: AppState) -> Router {
    handlers::router().with_state(state)
}

/// Sign an app token for tests, same scheme the auth provider uses.
pub fn issue_token(uid: &str, email: Option<&str>, email_verified: bool) -> String {
    let key = HS256Key::from_bytes(TEST_AUTH_SECRET.as_bytes());
    let custom = AppTokenClaims {
        email: email.map(str::to_string),
        email_verified,
        provider: Some("password".to_string()),
    };
    let claims = Claims::with_custom_claims(custom, Duration::from_hours(1)).with_subject(uid);
    key.authenticate(claims).expect("sign test token")
}

pub async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Value,
) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn send_get(app: Router, uri: &str, bearer: Option<&str>) -> Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

pub async fn assert_json(response: Response, expected_status: StatusCode) -> Value {
    assert_eq!(response.status(), expected_status);
    body_json(response).await
}

/// Post a RevenueCat webhook payload with the configured bearer token.
pub async fn send_webhook(app: Router, payload: Value) -> Response {
    send_json(
        app,
        "POST",
        "/v1/webhooks/revenuecat",
        Some(TEST_WEBHOOK_TOKEN),
        payload,
    )
    .await
}

/// Read a document straight from the store, bypassing the HTTP surface.
pub fn doc(
    store: &Arc<dyn DocumentStore>,
    collection: &str,
    id: &str,
) -> Option<serde_json::Map<String, Value>> {
    store.get(collection, id).expect("store read should succeed")
}
