//! Subscription state.
//!
//! Applies billing-provider events to the per-user subscription snapshot
//! with at-most-once effect. Dedup rests on the atomic create of the
//! write-once event record; ordering rests on the `latestEventAt` guard:
//! an event strictly older than the stored value never mutates the
//! snapshot. Redelivery and out-of-order delivery are expected provider
//! behavior, not errors.

pub mod revenuecat;

use std::sync::Arc;

use serde_json::json;

use crate::error::Result;
use crate::models::{SnapshotReport, SOURCE_WEBHOOK};
use crate::payments::revenuecat::NormalizedEvent;
use crate::store::{paths, Document, DocumentStore};
use crate::util::now_millis;

/// What ingesting one webhook event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// New event, snapshot updated.
    Applied,
    /// Event id already recorded; snapshot untouched.
    Duplicate,
    /// Event recorded but older than the snapshot's latest event; snapshot
    /// untouched.
    OutOfOrder,
}

impl IngestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Duplicate => "duplicate",
            Self::OutOfOrder => "out_of_order",
        }
    }
}

pub struct SubscriptionService {
    store: Arc<dyn DocumentStore>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Apply a normalized webhook event exactly once.
    ///
    /// Store errors on the event-record create or the snapshot merge are
    /// authoritative and surface to the caller (the provider retries, and
    /// the dedup record absorbs the redelivery).
    pub fn apply_webhook_event(&self, event: &NormalizedEvent) -> Result<IngestOutcome> {
        // 1. Dedup: first create of the event record wins; a second
        // delivery of the same event id is a no-op success.
        let record = event_record(event);
        if !self
            .store
            .create_if_absent(paths::WEBHOOK_EVENTS, &event.event_id, &record)?
        {
            tracing::info!(
                "Duplicate webhook event ignored: id={}, type={}",
                event.event_id,
                event.event_type.as_str()
            );
            return Ok(IngestOutcome::Duplicate);
        }

        // 2. Ordering guard: the event record above is already durable, so
        // a redelivery of this stale event will be caught as a duplicate,
        // not reprocessed.
        let collection = paths::payments(&event.app_user_id);
        let snapshot = self.store.get(&collection, paths::SUBSCRIPTION_DOC)?;
        let latest_event_at = snapshot
            .as_ref()
            .and_then(|doc| doc.get("latestEventAt"))
            .and_then(serde_json::Value::as_i64);
        if let Some(latest) = latest_event_at {
            if latest > event.event_at {
                tracing::info!(
                    "Out-of-order webhook event ignored: id={}, event_at={}, latest={}",
                    event.event_id,
                    event.event_at,
                    latest
                );
                return Ok(IngestOutcome::OutOfOrder);
            }
        }

        // 3 + 4. Derive the active flag and merge the snapshot.
        let is_active = derive_is_active(event, now_millis());
        let fields = snapshot_fields(event, is_active);
        self.store
            .merge_set(&collection, paths::SUBSCRIPTION_DOC, &fields)?;

        tracing::info!(
            "Webhook event applied: id={}, type={}, user={}, active={}",
            event.event_id,
            event.event_type.as_str(),
            event.app_user_id,
            is_active
        );
        Ok(IngestOutcome::Applied)
    }

    /// App-reported snapshot path: plain allow-listed merge, no ordering
    /// guard and no `latestEventAt`, so it can never shadow a webhook
    /// update.
    pub fn report_snapshot(&self, canonical_uid: &str, report: SnapshotReport) -> Result<()> {
        let collection = paths::payments(canonical_uid);
        let mut fields = report.into_document();
        fields.insert("appUserId".to_string(), json!(canonical_uid));
        self.store
            .merge_set(&collection, paths::SUBSCRIPTION_DOC, &fields)?;
        Ok(())
    }

    /// Current snapshot for a canonical user; empty document when absent.
    pub fn get_snapshot(&self, canonical_uid: &str) -> Result<Document> {
        let collection = paths::payments(canonical_uid);
        Ok(self
            .store
            .get(&collection, paths::SUBSCRIPTION_DOC)?
            .unwrap_or_default())
    }
}

/// Active-state derivation: the closed type table first, then the
/// expiration fallback (active iff expiration is in the future).
fn derive_is_active(event: &NormalizedEvent, now: i64) -> bool {
    match event.event_type.forces_active() {
        Some(active) => active,
        None => event.expiration_at.map(|exp| exp > now).unwrap_or(false),
    }
}

fn event_record(event: &NormalizedEvent) -> Document {
    let mut doc = Document::new();
    doc.insert("provider".to_string(), json!("revenuecat"));
    doc.insert("eventId".to_string(), json!(event.event_id));
    doc.insert("eventType".to_string(), json!(event.event_type.as_str()));
    doc.insert("appUserId".to_string(), json!(event.app_user_id));
    doc.insert("rawAppUserId".to_string(), json!(event.raw_app_user_id));
    doc.insert("eventAt".to_string(), json!(event.event_at));
    doc.insert("receivedAt".to_string(), json!(now_millis()));
    doc.insert("payload".to_string(), event.payload.clone());
    doc
}

fn snapshot_fields(event: &NormalizedEvent, is_active: bool) -> Document {
    let mut doc = Document::new();
    doc.insert("provider".to_string(), json!("revenuecat"));
    doc.insert("appUserId".to_string(), json!(event.app_user_id));
    doc.insert("rawAppUserId".to_string(), json!(event.raw_app_user_id));
    doc.insert("entitlementId".to_string(), json!(event.entitlement_id.clone().unwrap_or_default()));
    doc.insert("entitlementIds".to_string(), json!(event.entitlement_ids));
    doc.insert("isActive".to_string(), json!(is_active));
    doc.insert("productId".to_string(), json!(event.product_id));
    doc.insert("store".to_string(), json!(event.store));
    doc.insert("periodType".to_string(), json!(event.period_type));
    doc.insert("expirationAt".to_string(), json!(event.expiration_at));
    doc.insert("gracePeriodExpiresAt".to_string(), json!(event.grace_period_expires_at));
    doc.insert("latestEventAt".to_string(), json!(event.event_at));
    doc.insert("latestEventType".to_string(), json!(event.event_type.as_str()));
    doc.insert("rawEventId".to_string(), json!(event.event_id));
    doc.insert("dataSource".to_string(), json!(SOURCE_WEBHOOK));
    doc.insert("updatedAt".to_string(), json!(now_millis()));
    doc
}
