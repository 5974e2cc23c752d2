//! Subscription state machine tests: idempotence, ordering, and the
//! app-reported snapshot path.

mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use momentum_api::models::SnapshotReport;
use momentum_api::payments::revenuecat::normalize;
use momentum_api::payments::{IngestOutcome, SubscriptionService};
use momentum_api::store::{paths, DocumentStore, MemoryStore};

const T0: i64 = 1_750_000_000_000;

fn setup() -> (Arc<dyn DocumentStore>, SubscriptionService) {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let service = SubscriptionService::new(store.clone());
    (store, service)
}

fn event(id: &str, event_type: &str, user: &str, at_ms: i64, extra: Value) -> Value {
    let mut payload = json!({
        "event": {
            "id": id,
            "type": event_type,
            "app_user_id": user,
            "event_timestamp_ms": at_ms,
        }
    });
    if let Some(extra) = extra.as_object() {
        let inner = payload["event"].as_object_mut().unwrap();
        for (k, v) in extra {
            inner.insert(k.clone(), v.clone());
        }
    }
    payload
}

fn snapshot(store: &Arc<dyn DocumentStore>, user: &str) -> serde_json::Map<String, Value> {
    store
        .get(&paths::payments(user), paths::SUBSCRIPTION_DOC)
        .unwrap()
        .expect("snapshot should exist")
}

#[test]
fn applies_initial_purchase() {
    let (store, service) = setup();

    let payload = event(
        "evt_1",
        "INITIAL_PURCHASE",
        "u1",
        T0,
        json!({"product_id": "momentum_annual", "entitlement_ids": ["pro"]}),
    );
    let outcome = service
        .apply_webhook_event(&normalize(&payload).unwrap())
        .unwrap();

    assert_eq!(outcome, IngestOutcome::Applied);
    let doc = snapshot(&store, "u1");
    assert_eq!(doc.get("isActive"), Some(&Value::Bool(true)));
    assert_eq!(doc.get("entitlementId"), Some(&Value::from("pro")));
    assert_eq!(doc.get("latestEventAt"), Some(&Value::from(T0)));
    assert_eq!(doc.get("latestEventType"), Some(&Value::from("INITIAL_PURCHASE")));
    assert_eq!(doc.get("dataSource"), Some(&Value::from("revenuecat_webhook")));

    // The event record is durable under its id.
    assert!(store
        .get(paths::WEBHOOK_EVENTS, "evt_1")
        .unwrap()
        .is_some());
}

#[test]
fn redelivery_is_a_duplicate_and_leaves_the_snapshot_alone() {
    let (store, service) = setup();

    let payload = event("evt_1", "INITIAL_PURCHASE", "u1", T0, json!({}));
    let normalized = normalize(&payload).unwrap();
    assert_eq!(
        service.apply_webhook_event(&normalized).unwrap(),
        IngestOutcome::Applied
    );
    let before = snapshot(&store, "u1");

    assert_eq!(
        service.apply_webhook_event(&normalized).unwrap(),
        IngestOutcome::Duplicate
    );
    assert_eq!(snapshot(&store, "u1"), before);
}

#[test]
fn stale_event_is_rejected_without_mutating_the_snapshot() {
    let (store, service) = setup();

    let renewal = event("evt_renew", "RENEWAL", "u1", T0, json!({}));
    service
        .apply_webhook_event(&normalize(&renewal).unwrap())
        .unwrap();

    // A cancellation stamped 60s before the renewal arrives late.
    let stale = event("evt_cancel", "CANCELLATION", "u1", T0 - 60_000, json!({}));
    let outcome = service
        .apply_webhook_event(&normalize(&stale).unwrap())
        .unwrap();
    assert_eq!(outcome, IngestOutcome::OutOfOrder);

    let doc = snapshot(&store, "u1");
    assert_eq!(doc.get("isActive"), Some(&Value::Bool(true)));
    assert_eq!(doc.get("latestEventAt"), Some(&Value::from(T0)));
    assert_eq!(doc.get("latestEventType"), Some(&Value::from("RENEWAL")));

    // The stale event is still recorded, so its redelivery dedups.
    assert!(store.get(paths::WEBHOOK_EVENTS, "evt_cancel").unwrap().is_some());
    let outcome = service
        .apply_webhook_event(&normalize(&stale).unwrap())
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Duplicate);
}

#[test]
fn equal_timestamp_event_still_applies() {
    let (store, service) = setup();

    let first = event("evt_a", "INITIAL_PURCHASE", "u1", T0, json!({}));
    service.apply_webhook_event(&normalize(&first).unwrap()).unwrap();

    let second = event("evt_b", "CANCELLATION", "u1", T0, json!({}));
    let outcome = service
        .apply_webhook_event(&normalize(&second).unwrap())
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Applied);
    assert_eq!(
        snapshot(&store, "u1").get("isActive"),
        Some(&Value::Bool(false))
    );
}

#[test]
fn expiration_deactivates() {
    let (store, service) = setup();

    let purchase = event("evt_1", "INITIAL_PURCHASE", "u1", T0, json!({}));
    service.apply_webhook_event(&normalize(&purchase).unwrap()).unwrap();

    let expiration = event("evt_2", "EXPIRATION", "u1", T0 + 1_000, json!({}));
    service.apply_webhook_event(&normalize(&expiration).unwrap()).unwrap();

    let doc = snapshot(&store, "u1");
    assert_eq!(doc.get("isActive"), Some(&Value::Bool(false)));
    assert_eq!(doc.get("latestEventType"), Some(&Value::from("EXPIRATION")));
}

#[test]
fn unrecognized_type_uses_expiration_fallback() {
    let (store, service) = setup();

    // Far-future expiration keeps the subscription active.
    let far_future = chrono::Utc::now().timestamp_millis() + 86_400_000;
    let payload = event(
        "evt_odd",
        "SUBSCRIPTION_EXTENDED",
        "u1",
        T0,
        json!({"expiration_at_ms": far_future}),
    );
    service.apply_webhook_event(&normalize(&payload).unwrap()).unwrap();

    let doc = snapshot(&store, "u1");
    assert_eq!(doc.get("isActive"), Some(&Value::Bool(true)));
    assert_eq!(
        doc.get("latestEventType"),
        Some(&Value::from("SUBSCRIPTION_EXTENDED"))
    );
}

#[test]
fn app_report_never_writes_latest_event_at() {
    let (store, service) = setup();

    let report: SnapshotReport = serde_json::from_value(json!({
        "isActive": true,
        "entitlementIds": ["pro"],
        "productId": "momentum_annual",
        "paymentOption": "annual",
    }))
    .unwrap();
    service.report_snapshot("u1", report).unwrap();

    let doc = snapshot(&store, "u1");
    assert_eq!(doc.get("isActive"), Some(&Value::Bool(true)));
    assert_eq!(doc.get("dataSource"), Some(&Value::from("app_report")));
    assert!(doc.get("latestEventAt").is_none());

    // A webhook event then applies normally; the app report cannot have
    // blocked it through the ordering guard.
    let payload = event("evt_1", "CANCELLATION", "u1", T0, json!({}));
    let outcome = service
        .apply_webhook_event(&normalize(&payload).unwrap())
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Applied);
    let doc = snapshot(&store, "u1");
    assert_eq!(doc.get("isActive"), Some(&Value::Bool(false)));
    assert_eq!(doc.get("dataSource"), Some(&Value::from("revenuecat_webhook")));
}

#[test]
fn get_snapshot_defaults_to_empty() {
    let (_, service) = setup();
    assert!(service.get_snapshot("nobody").unwrap().is_empty());
}
