use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::identity::IdentityResolver;
use crate::payments::SubscriptionService;
use crate::store::DocumentStore;

/// Application state shared by every handler. The store client is
/// constructed once at startup and injected; components build on the same
/// shared handle.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    /// Shared secret RevenueCat presents as a bearer token.
    pub revenuecat_webhook_token: String,
    /// Accept a bare X-User-Id header instead of a token (local dev only).
    pub allow_dev_user_header: bool,
}

impl AppState {
    pub fn identity(&self) -> IdentityResolver {
        IdentityResolver::new(self.store.clone())
    }

    pub fn subscriptions(&self) -> SubscriptionService {
        SubscriptionService::new(self.store.clone())
    }
}
