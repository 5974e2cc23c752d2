//! Maintenance commands.
//!
//! Operator tooling that runs against the configured store directly:
//! payment resets, payment-state inspection, and the one-off backfill of
//! `paymentOption` from profile docs into subscription docs. These are
//! plain sequential scans; nothing here is concurrency-sensitive.

use serde_json::{json, Value};

use crate::models::EmailAlias;
use crate::store::{paths, Document, DocumentStore};
use crate::util::{normalize_email, now_millis};

/// Resolve a target user from `--email` (through the email alias) or a
/// raw `--uid`.
pub fn resolve_uid(
    store: &dyn DocumentStore,
    email: Option<&str>,
    uid: Option<&str>,
) -> Result<String, String> {
    if let Some(uid) = uid {
        let uid = uid.trim();
        if uid.is_empty() {
            return Err("--uid cannot be empty".to_string());
        }
        return Ok(uid.to_string());
    }

    let Some(email) = email else {
        return Err("either --email or --uid is required".to_string());
    };
    let normalized = normalize_email(email);

    let doc = store
        .get(paths::EMAIL_ALIASES, &normalized)
        .map_err(|e| format!("failed to read email alias: {e}"))?
        .ok_or_else(|| format!("no email alias found for {normalized}"))?;

    match EmailAlias::from_document(&doc) {
        Some(alias) if !alias.canonical_user_id.trim().is_empty() => {
            Ok(alias.canonical_user_id.trim().to_string())
        }
        _ => Err(format!(
            "alias exists but canonicalUserId is missing for {normalized}"
        )),
    }
}

/// Delete everything under `users/{uid}/payments`, clear the profile's
/// `paymentOption`, and optionally drop the user's webhook event records.
pub fn reset_payments(
    store: &dyn DocumentStore,
    uid: &str,
    clear_webhook_events: bool,
    dry_run: bool,
) -> Result<(), String> {
    let payments = paths::payments(uid);
    println!("Target user uid: {uid}");
    println!("Target root: {payments}");

    let action = if dry_run { "Would delete" } else { "Deleted" };
    clear_collection(store, &payments, dry_run)?;

    let profile = paths::profile(uid);
    let profile_doc = store
        .get(&profile, paths::PROFILE_DOC)
        .map_err(|e| format!("failed to read profile doc: {e}"))?;
    let has_payment_option = profile_doc
        .as_ref()
        .map(|doc| doc.contains_key("paymentOption"))
        .unwrap_or(false);

    if has_payment_option {
        if !dry_run {
            let mut fields = Document::new();
            fields.insert("paymentOption".to_string(), Value::Null);
            fields.insert("updatedAt".to_string(), json!(now_millis()));
            store
                .merge_set(&profile, paths::PROFILE_DOC, &fields)
                .map_err(|e| format!("failed to reset profile paymentOption: {e}"))?;
        }
        let action = if dry_run { "Would reset" } else { "Reset" };
        println!("{action} paymentOption in {profile}/{}", paths::PROFILE_DOC);
    } else {
        println!("No paymentOption field found in {profile}/{}", paths::PROFILE_DOC);
    }

    if clear_webhook_events {
        let ids = webhook_event_ids_for(store, uid)?;
        if !dry_run {
            for id in &ids {
                store
                    .delete(paths::WEBHOOK_EVENTS, id)
                    .map_err(|e| format!("failed to delete event {id}: {e}"))?;
            }
        }
        println!(
            "{action} {} doc(s) in {} for uid={uid}",
            ids.len(),
            paths::WEBHOOK_EVENTS
        );
    }

    if dry_run {
        println!("Dry run: no changes applied.");
    } else {
        println!("Completed payment reset.");
    }
    Ok(())
}

/// Subcollections under `users/{uid}` that hold runtime data. Identity
/// aliases live elsewhere and survive an onboarding reset.
const ONBOARDING_COLLECTIONS: [fn(&str) -> String; 5] = [
    paths::profile,
    paths::routine,
    paths::progress,
    paths::stats,
    paths::payments,
];

/// Delete all runtime user data under `users/{uid}`, keeping the email and
/// uid aliases so the user keeps their canonical id on next login.
pub fn reset_onboarding(store: &dyn DocumentStore, uid: &str, dry_run: bool) -> Result<(), String> {
    println!("Target user uid: {uid}");
    println!("Target root: users/{uid}");

    let mut total = 0;
    for collection in ONBOARDING_COLLECTIONS {
        total += clear_collection(store, &collection(uid), dry_run)?;
    }

    if dry_run {
        println!("Dry run: no changes applied.");
    } else {
        println!("Completed. Deleted {total} doc(s).");
    }
    Ok(())
}

/// Delete just the profile document, leaving everything else in place.
pub fn reset_profile(store: &dyn DocumentStore, uid: &str, dry_run: bool) -> Result<(), String> {
    let profile = paths::profile(uid);
    println!("Target user uid: {uid}");
    println!("Target doc: {profile}/{}", paths::PROFILE_DOC);

    if dry_run {
        println!("Dry run: no changes applied.");
        return Ok(());
    }

    store
        .delete(&profile, paths::PROFILE_DOC)
        .map_err(|e| format!("failed to delete profile doc: {e}"))?;
    println!("Deleted profile document.");
    Ok(())
}

/// Delete every document in a collection, returning how many were (or
/// would be) removed.
fn clear_collection(
    store: &dyn DocumentStore,
    collection: &str,
    dry_run: bool,
) -> Result<usize, String> {
    let docs = store
        .list(collection)
        .map_err(|e| format!("failed to list {collection}: {e}"))?;
    if !dry_run {
        for (id, _) in &docs {
            store
                .delete(collection, id)
                .map_err(|e| format!("failed to delete {collection}/{id}: {e}"))?;
        }
    }
    let action = if dry_run { "Would delete" } else { "Deleted" };
    println!("{action} {} doc(s) in {collection}", docs.len());
    Ok(docs.len())
}

/// Print payment state and webhook events for one user.
pub fn check_payments(store: &dyn DocumentStore, uid: &str) -> Result<(), String> {
    println!("Target user uid: {uid}");

    println!("\n=== Profile Doc (paymentOption focus) ===");
    let profile = store
        .get(&paths::profile(uid), paths::PROFILE_DOC)
        .map_err(|e| format!("failed to read profile: {e}"))?;
    match &profile {
        Some(doc) => println!(
            "paymentOption: {}",
            doc.get("paymentOption").cloned().unwrap_or(Value::Null)
        ),
        None => println!("Profile doc does not exist."),
    }

    println!("\n=== Subscription Doc ===");
    let subscription = store
        .get(&paths::payments(uid), paths::SUBSCRIPTION_DOC)
        .map_err(|e| format!("failed to read subscription: {e}"))?;
    match &subscription {
        Some(doc) => println!("{}", pretty(doc)),
        None => println!("Subscription doc does not exist."),
    }

    println!("\n=== RevenueCat Webhook Events ===");
    let mut events = webhook_events_for(store, uid)?;
    // Newest first; events without a timestamp sort last.
    events.sort_by_key(|(id, doc)| {
        (
            std::cmp::Reverse(doc.get("eventAt").and_then(Value::as_i64).unwrap_or(i64::MIN)),
            id.clone(),
        )
    });
    println!("Total unique events (appUserId/rawAppUserId match): {}", events.len());
    for (idx, (id, doc)) in events.iter().enumerate() {
        println!("---");
        println!("{}. eventId={id}", idx + 1);
        println!("   eventType={}", field_str(doc, "eventType"));
        println!("   eventAt={}", doc.get("eventAt").cloned().unwrap_or(Value::Null));
        println!("   appUserId={}", field_str(doc, "appUserId"));
        println!("   rawAppUserId={}", field_str(doc, "rawAppUserId"));
    }
    Ok(())
}

/// Copy `profile.paymentOption` into the subscription doc where the latter
/// lacks one. Dry-run unless `apply`.
pub fn backfill_payment_option(
    store: &dyn DocumentStore,
    uid: Option<&str>,
    all_users: bool,
    apply: bool,
) -> Result<(), String> {
    let uids = if all_users {
        all_uids(store)?
    } else {
        vec![uid
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "either --uid or --all is required".to_string())?
            .to_string()]
    };

    if uids.is_empty() {
        println!("No users found to process.");
        return Ok(());
    }

    let dry_run = !apply;
    let action = if dry_run { "Would copy" } else { "Copied" };
    println!("Mode: {}", if dry_run { "DRY-RUN" } else { "APPLY" });
    println!("Target users: {}", uids.len());

    let mut scanned = 0usize;
    let mut copied = 0usize;
    let mut skipped_existing = 0usize;
    let mut skipped_missing = 0usize;
    let mut conflicts = 0usize;

    for uid in &uids {
        scanned += 1;
        let profile = store
            .get(&paths::profile(uid), paths::PROFILE_DOC)
            .map_err(|e| format!("users/{uid}: failed to read profile: {e}"))?
            .unwrap_or_default();
        let subscription = store
            .get(&paths::payments(uid), paths::SUBSCRIPTION_DOC)
            .map_err(|e| format!("users/{uid}: failed to read subscription: {e}"))?
            .unwrap_or_default();

        let profile_option =
            coerce_payment_option(profile.get("paymentOption").and_then(Value::as_str));
        let subscription_option =
            coerce_payment_option(subscription.get("paymentOption").and_then(Value::as_str));

        if let Some(existing) = subscription_option {
            skipped_existing += 1;
            if let Some(ref from_profile) = profile_option {
                if *from_profile != existing {
                    conflicts += 1;
                    println!(
                        "[CONFLICT] users/{uid}: profile={from_profile} subscription={existing}"
                    );
                }
            }
            continue;
        }

        let Some(option) = profile_option else {
            skipped_missing += 1;
            continue;
        };

        if dry_run {
            copied += 1;
            println!("[DRY-RUN] {action} users/{uid} paymentOption={option}");
            continue;
        }

        let mut fields = Document::new();
        fields.insert("paymentOption".to_string(), json!(option));
        fields.insert("provider".to_string(), json!("profile_sync"));
        fields.insert(
            "source".to_string(),
            json!("profile_payment_option_migration"),
        );
        fields.insert("updatedAt".to_string(), json!(now_millis()));
        store
            .merge_set(&paths::payments(uid), paths::SUBSCRIPTION_DOC, &fields)
            .map_err(|e| format!("users/{uid}: failed to write subscription doc: {e}"))?;
        copied += 1;
        println!("[OK] {action} users/{uid} paymentOption={option}");
    }

    println!("\nSummary");
    println!("- scanned: {scanned}");
    println!("- copied: {copied}");
    println!("- skipped_existing: {skipped_existing}");
    println!("- skipped_missing: {skipped_missing}");
    println!("- conflicts: {conflicts}");
    Ok(())
}

/// Normalize a stored payment option to its canonical spelling.
fn coerce_payment_option(raw: Option<&str>) -> Option<String> {
    let normalized = raw?.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    Some(
        match normalized.as_str() {
            "annual" | "yearly" | "year" => "annual",
            "monthly" | "month" => "monthly",
            "weekly" | "week" => "weekly",
            "lifetime" | "life" => "lifetime",
            other => other,
        }
        .to_string(),
    )
}

fn webhook_events_for(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Vec<(String, Document)>, String> {
    let uid_value = json!(uid);
    let mut events = store
        .query_by_equality(paths::WEBHOOK_EVENTS, "appUserId", &uid_value)
        .map_err(|e| format!("failed to query events: {e}"))?;
    let by_raw = store
        .query_by_equality(paths::WEBHOOK_EVENTS, "rawAppUserId", &uid_value)
        .map_err(|e| format!("failed to query events: {e}"))?;
    for (id, doc) in by_raw {
        if !events.iter().any(|(existing, _)| *existing == id) {
            events.push((id, doc));
        }
    }
    Ok(events)
}

fn webhook_event_ids_for(store: &dyn DocumentStore, uid: &str) -> Result<Vec<String>, String> {
    Ok(webhook_events_for(store, uid)?
        .into_iter()
        .map(|(id, _)| id)
        .collect())
}

/// Every uid with at least one document under `users/{uid}/...`.
fn all_uids(store: &dyn DocumentStore) -> Result<Vec<String>, String> {
    let collections = store
        .list_collections("users/")
        .map_err(|e| format!("failed to list user collections: {e}"))?;
    let mut uids: Vec<String> = collections
        .iter()
        .filter_map(|name| name.split('/').nth(1))
        .filter(|uid| !uid.is_empty())
        .map(str::to_string)
        .collect();
    uids.sort();
    uids.dedup();
    Ok(uids)
}

fn field_str<'a>(doc: &'a Document, key: &str) -> &'a str {
    doc.get(key).and_then(Value::as_str).unwrap_or("")
}

fn pretty(doc: &Document) -> String {
    serde_json::to_string_pretty(&Value::Object(doc.clone()))
        .unwrap_or_else(|_| "<unprintable>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn coerces_payment_option_aliases() {
        assert_eq!(coerce_payment_option(Some("Yearly")), Some("annual".to_string()));
        assert_eq!(coerce_payment_option(Some("month")), Some("monthly".to_string()));
        assert_eq!(coerce_payment_option(Some("custom")), Some("custom".to_string()));
        assert_eq!(coerce_payment_option(Some("  ")), None);
        assert_eq!(coerce_payment_option(None), None);
    }

    #[test]
    fn resolve_uid_prefers_explicit_uid() {
        let store = MemoryStore::new();
        assert_eq!(
            resolve_uid(&store, Some("a@b.com"), Some(" uid-1 ")).unwrap(),
            "uid-1"
        );
    }

    fn seed_user(store: &MemoryStore, uid: &str) {
        let mut profile = Document::new();
        profile.insert("nickname".to_string(), json!("Sam"));
        profile.insert("paymentOption".to_string(), json!("annual"));
        store
            .merge_set(&paths::profile(uid), paths::PROFILE_DOC, &profile)
            .unwrap();

        let mut subscription = Document::new();
        subscription.insert("isActive".to_string(), json!(true));
        store
            .merge_set(&paths::payments(uid), paths::SUBSCRIPTION_DOC, &subscription)
            .unwrap();

        let mut event = Document::new();
        event.insert("appUserId".to_string(), json!(uid));
        event.insert("rawAppUserId".to_string(), json!(uid));
        store
            .merge_set(paths::WEBHOOK_EVENTS, &format!("evt_{uid}"), &event)
            .unwrap();
    }

    #[test]
    fn reset_payments_dry_run_changes_nothing() {
        let store = MemoryStore::new();
        seed_user(&store, "u1");

        reset_payments(&store, "u1", true, true).unwrap();

        assert!(store
            .get(&paths::payments("u1"), paths::SUBSCRIPTION_DOC)
            .unwrap()
            .is_some());
        let profile = store
            .get(&paths::profile("u1"), paths::PROFILE_DOC)
            .unwrap()
            .unwrap();
        assert_eq!(profile.get("paymentOption"), Some(&json!("annual")));
        assert!(store.get(paths::WEBHOOK_EVENTS, "evt_u1").unwrap().is_some());
    }

    #[test]
    fn reset_payments_clears_docs_and_payment_option() {
        let store = MemoryStore::new();
        seed_user(&store, "u1");
        seed_user(&store, "u2");

        reset_payments(&store, "u1", false, false).unwrap();

        assert!(store
            .get(&paths::payments("u1"), paths::SUBSCRIPTION_DOC)
            .unwrap()
            .is_none());
        let profile = store
            .get(&paths::profile("u1"), paths::PROFILE_DOC)
            .unwrap()
            .unwrap();
        // paymentOption is removed, not nulled; the rest of the profile stays.
        assert!(!profile.contains_key("paymentOption"));
        assert_eq!(profile.get("nickname"), Some(&json!("Sam")));

        // Webhook events survive unless explicitly cleared; other users
        // are untouched.
        assert!(store.get(paths::WEBHOOK_EVENTS, "evt_u1").unwrap().is_some());
        assert!(store
            .get(&paths::payments("u2"), paths::SUBSCRIPTION_DOC)
            .unwrap()
            .is_some());
    }

    #[test]
    fn reset_payments_can_clear_webhook_events() {
        let store = MemoryStore::new();
        seed_user(&store, "u1");
        seed_user(&store, "u2");

        reset_payments(&store, "u1", true, false).unwrap();

        assert!(store.get(paths::WEBHOOK_EVENTS, "evt_u1").unwrap().is_none());
        assert!(store.get(paths::WEBHOOK_EVENTS, "evt_u2").unwrap().is_some());
    }

    #[test]
    fn reset_onboarding_clears_runtime_data_but_keeps_aliases() {
        let store = MemoryStore::new();
        seed_user(&store, "u1");
        let mut routine = Document::new();
        routine.insert("tasks".to_string(), json!([]));
        store
            .merge_set(&paths::routine("u1"), paths::ROUTINE_DOC, &routine)
            .unwrap();
        let mut alias = Document::new();
        alias.insert("canonicalUserId".to_string(), json!("u1"));
        store
            .merge_set(paths::EMAIL_ALIASES, "a@b.com", &alias)
            .unwrap();
        store.merge_set(paths::UID_ALIASES, "u1", &alias).unwrap();

        reset_onboarding(&store, "u1", false).unwrap();

        assert!(store
            .get(&paths::profile("u1"), paths::PROFILE_DOC)
            .unwrap()
            .is_none());
        assert!(store
            .get(&paths::routine("u1"), paths::ROUTINE_DOC)
            .unwrap()
            .is_none());
        assert!(store
            .get(&paths::payments("u1"), paths::SUBSCRIPTION_DOC)
            .unwrap()
            .is_none());
        assert!(store.get(paths::EMAIL_ALIASES, "a@b.com").unwrap().is_some());
        assert!(store.get(paths::UID_ALIASES, "u1").unwrap().is_some());
    }

    #[test]
    fn reset_profile_deletes_only_the_profile_doc() {
        let store = MemoryStore::new();
        seed_user(&store, "u1");

        reset_profile(&store, "u1", true).unwrap();
        assert!(store
            .get(&paths::profile("u1"), paths::PROFILE_DOC)
            .unwrap()
            .is_some());

        reset_profile(&store, "u1", false).unwrap();
        assert!(store
            .get(&paths::profile("u1"), paths::PROFILE_DOC)
            .unwrap()
            .is_none());
        assert!(store
            .get(&paths::payments("u1"), paths::SUBSCRIPTION_DOC)
            .unwrap()
            .is_some());
    }

    #[test]
    fn backfill_copies_profile_option_when_subscription_lacks_one() {
        let store = MemoryStore::new();
        seed_user(&store, "u1");
        // Subscription doc exists but has no paymentOption.

        // Dry run reports without writing.
        backfill_payment_option(&store, Some("u1"), false, false).unwrap();
        let subscription = store
            .get(&paths::payments("u1"), paths::SUBSCRIPTION_DOC)
            .unwrap()
            .unwrap();
        assert!(!subscription.contains_key("paymentOption"));

        backfill_payment_option(&store, Some("u1"), false, true).unwrap();
        let subscription = store
            .get(&paths::payments("u1"), paths::SUBSCRIPTION_DOC)
            .unwrap()
            .unwrap();
        assert_eq!(subscription.get("paymentOption"), Some(&json!("annual")));
        assert_eq!(subscription.get("provider"), Some(&json!("profile_sync")));
        assert_eq!(
            subscription.get("source"),
            Some(&json!("profile_payment_option_migration"))
        );
    }

    #[test]
    fn backfill_skips_existing_and_normalizes_aliases() {
        let store = MemoryStore::new();
        // Profile says "Yearly"; subscription already carries "monthly".
        let mut profile = Document::new();
        profile.insert("paymentOption".to_string(), json!("Yearly"));
        store
            .merge_set(&paths::profile("u1"), paths::PROFILE_DOC, &profile)
            .unwrap();
        let mut subscription = Document::new();
        subscription.insert("paymentOption".to_string(), json!("monthly"));
        store
            .merge_set(&paths::payments("u1"), paths::SUBSCRIPTION_DOC, &subscription)
            .unwrap();

        backfill_payment_option(&store, Some("u1"), false, true).unwrap();

        // Existing value wins; the conflict is only reported.
        let subscription = store
            .get(&paths::payments("u1"), paths::SUBSCRIPTION_DOC)
            .unwrap()
            .unwrap();
        assert_eq!(subscription.get("paymentOption"), Some(&json!("monthly")));
    }

    #[test]
    fn backfill_all_scans_every_user_with_documents() {
        let store = MemoryStore::new();
        seed_user(&store, "u1");
        // u2 has a profile option but no subscription doc at all.
        let mut profile = Document::new();
        profile.insert("paymentOption".to_string(), json!("week"));
        store
            .merge_set(&paths::profile("u2"), paths::PROFILE_DOC, &profile)
            .unwrap();

        backfill_payment_option(&store, None, true, true).unwrap();

        let s1 = store
            .get(&paths::payments("u1"), paths::SUBSCRIPTION_DOC)
            .unwrap()
            .unwrap();
        assert_eq!(s1.get("paymentOption"), Some(&json!("annual")));
        let s2 = store
            .get(&paths::payments("u2"), paths::SUBSCRIPTION_DOC)
            .unwrap()
            .unwrap();
        assert_eq!(s2.get("paymentOption"), Some(&json!("weekly")));
    }

    #[test]
    fn resolve_uid_reads_email_alias() {
        let store = MemoryStore::new();
        let mut alias = Document::new();
        alias.insert("canonicalUserId".to_string(), json!("uid-42"));
        store
            .merge_set(paths::EMAIL_ALIASES, "user@example.com", &alias)
            .unwrap();

        assert_eq!(
            resolve_uid(&store, Some(" User@Example.COM "), None).unwrap(),
            "uid-42"
        );
        assert!(resolve_uid(&store, Some("missing@example.com"), None).is_err());
    }
}
