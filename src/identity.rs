//! Identity canonicalization.
//!
//! Auth-provider uids rotate: the same person can show up with a new uid
//! after reinstalling or switching sign-in methods. All user data is keyed
//! by one canonical user id, chosen when the first login for a verified
//! email wins the atomic create of that email's alias document. Once
//! assigned, the canonical id for an email never changes.
//!
//! Two alias collections back this up:
//! - `user_email_aliases/{normalized email}` — authoritative; created once,
//!   `canonicalUserId` is immutable after creation.
//! - `user_uid_aliases/{uid}` — non-authoritative cache mapping every uid
//!   that ever authenticated to its canonical id; refreshed on every login.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::auth::VerifiedIdentity;
use crate::error::{AppError, Result};
use crate::models::UidAlias;
use crate::store::{paths, Document, DocumentStore};
use crate::util::{normalize_email, now_millis};

pub struct IdentityResolver {
    store: Arc<dyn DocumentStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Resolve a verified login to its canonical user id.
    ///
    /// Safe under concurrent first-time logins for the same email: both
    /// racers attempt the atomic create of the email alias, exactly one
    /// wins, and the loser reads the winner's canonical id back. Alias
    /// refreshes are best-effort and never fail the resolution.
    pub fn resolve(&self, login: &VerifiedIdentity) -> Result<String> {
        let uid = login.uid.trim();
        if uid.is_empty() {
            return Err(AppError::BadRequest("subject id is empty".to_string()));
        }

        let verified_email = match (&login.email, login.email_verified) {
            (Some(email), true) if !email.trim().is_empty() => Some(normalize_email(email)),
            _ => None,
        };

        let Some(email) = verified_email else {
            // No shared email state to contend on; the uid is its own
            // canonical id.
            self.refresh_uid_alias(uid, uid, login.email.as_deref(), &login.provider);
            return Ok(uid.to_string());
        };

        let canonical = self.claim_or_read_email_alias(&email, uid, &login.provider)?;

        self.refresh_email_alias(&email, uid, &login.provider);
        self.refresh_uid_alias(uid, &canonical, Some(&email), &login.provider);
        if canonical != uid {
            self.refresh_uid_alias(&canonical, &canonical, Some(&email), &login.provider);
        }

        Ok(canonical)
    }

    /// Resolve a billing-provider app-user id (an external uid, not
    /// necessarily canonical) through the uid-alias cache.
    ///
    /// Falls back to the raw id itself when no alias exists or the store is
    /// unreachable — event processing must never block on identity state.
    /// Known gap: an event arriving before the user's first login keys its
    /// snapshot under the raw id, and a later login does not merge it.
    pub fn canonical_for_app_user_id(&self, raw_app_user_id: &str) -> String {
        match self.store.get(paths::UID_ALIASES, raw_app_user_id) {
            Ok(Some(doc)) => match UidAlias::from_document(&doc) {
                Some(alias) if !alias.canonical_user_id.trim().is_empty() => {
                    alias.canonical_user_id
                }
                _ => raw_app_user_id.to_string(),
            },
            Ok(None) => raw_app_user_id.to_string(),
            Err(e) => {
                tracing::warn!(
                    "UID alias lookup failed for {}, using raw id: {}",
                    raw_app_user_id,
                    e
                );
                raw_app_user_id.to_string()
            }
        }
    }

    /// Attempt the authoritative create of the email alias; on loss read the
    /// winner's canonical id.
    fn claim_or_read_email_alias(&self, email: &str, uid: &str, provider: &str) -> Result<String> {
        let now = now_millis();
        let mut alias = Document::new();
        alias.insert("canonicalUserId".to_string(), json!(uid));
        alias.insert("firstUid".to_string(), json!(uid));
        alias.insert("lastUid".to_string(), json!(uid));
        alias.insert("lastProvider".to_string(), json!(provider));
        alias.insert("createdAt".to_string(), json!(now));
        alias.insert("updatedAt".to_string(), json!(now));

        if self
            .store
            .create_if_absent(paths::EMAIL_ALIASES, email, &alias)?
        {
            return Ok(uid.to_string());
        }

        // Lost the race (or the alias predates this login): the stored
        // canonical id is authoritative. A transient read failure here falls
        // back to the subject id — degraded but it never blocks login.
        match self.store.get(paths::EMAIL_ALIASES, email) {
            Ok(Some(existing)) => {
                match existing.get("canonicalUserId").and_then(Value::as_str) {
                    Some(canonical) if !canonical.trim().is_empty() => Ok(canonical.to_string()),
                    _ => {
                        tracing::warn!(
                            "Email alias for {} has no canonicalUserId, using subject id",
                            email
                        );
                        Ok(uid.to_string())
                    }
                }
            }
            Ok(None) | Err(_) => {
                tracing::warn!(
                    "Email alias read-back failed for {}, using subject id",
                    email
                );
                Ok(uid.to_string())
            }
        }
    }

    /// Best-effort refresh of the email alias's last-seen fields. Never
    /// touches `canonicalUserId`, `firstUid`, or `createdAt`.
    fn refresh_email_alias(&self, email: &str, uid: &str, provider: &str) {
        let mut fields = Document::new();
        fields.insert("lastUid".to_string(), json!(uid));
        fields.insert("lastProvider".to_string(), json!(provider));
        fields.insert("updatedAt".to_string(), json!(now_millis()));

        if let Err(e) = self.store.merge_set(paths::EMAIL_ALIASES, email, &fields) {
            tracing::warn!("Email alias refresh failed for {}: {}", email, e);
        }
    }

    /// Best-effort refresh of a uid alias to point at the canonical id.
    fn refresh_uid_alias(&self, uid: &str, canonical: &str, email: Option<&str>, provider: &str) {
        let mut fields = Document::new();
        fields.insert("canonicalUserId".to_string(), json!(canonical));
        if let Some(email) = email {
            fields.insert("lastEmail".to_string(), json!(normalize_email(email)));
        }
        fields.insert("lastProvider".to_string(), json!(provider));
        fields.insert("updatedAt".to_string(), json!(now_millis()));

        if let Err(e) = self.store.merge_set(paths::UID_ALIASES, uid, &fields) {
            tracing::warn!("UID alias refresh failed for {}: {}", uid, e);
        }
    }
}
