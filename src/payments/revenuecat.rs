//! RevenueCat webhook payload normalization.
//!
//! RevenueCat delivers one JSON event per call, either as the top-level
//! object or wrapped under an `event` key, and redelivers freely. This
//! module extracts the fields the state machine needs and fixes the closed
//! event-type table; it performs no store access.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::util::now_millis;

/// Sentinel stored when the payload carries no `type` field.
pub const UNKNOWN_EVENT_TYPE: &str = "UNKNOWN";

/// RevenueCat event types that drive subscription state.
///
/// The table is closed: activating and deactivating types force the active
/// flag; everything else falls back to comparing the expiration timestamp
/// against the current time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    InitialPurchase,
    Renewal,
    Uncancellation,
    ProductChange,
    Expiration,
    Cancellation,
    BillingIssue,
    Other(String),
}

impl EventType {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "INITIAL_PURCHASE" => Self::InitialPurchase,
            "RENEWAL" => Self::Renewal,
            "UNCANCELLATION" => Self::Uncancellation,
            "PRODUCT_CHANGE" => Self::ProductChange,
            "EXPIRATION" => Self::Expiration,
            "CANCELLATION" => Self::Cancellation,
            "BILLING_ISSUE" => Self::BillingIssue,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InitialPurchase => "INITIAL_PURCHASE",
            Self::Renewal => "RENEWAL",
            Self::Uncancellation => "UNCANCELLATION",
            Self::ProductChange => "PRODUCT_CHANGE",
            Self::Expiration => "EXPIRATION",
            Self::Cancellation => "CANCELLATION",
            Self::BillingIssue => "BILLING_ISSUE",
            Self::Other(raw) => raw,
        }
    }

    /// `Some(true)` for activating types, `Some(false)` for deactivating
    /// types, `None` when the type alone does not decide.
    pub fn forces_active(&self) -> Option<bool> {
        match self {
            Self::InitialPurchase | Self::Renewal | Self::Uncancellation | Self::ProductChange => {
                Some(true)
            }
            Self::Expiration | Self::Cancellation | Self::BillingIssue => Some(false),
            Self::Other(_) => None,
        }
    }
}

/// A webhook event reduced to the fields the state machine acts on.
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub event_id: String,
    pub event_type: EventType,
    /// Canonical user id (resolved through the uid-alias cache).
    pub app_user_id: String,
    /// App-user id exactly as the billing provider sent it.
    pub raw_app_user_id: String,
    pub entitlement_id: Option<String>,
    pub entitlement_ids: Vec<String>,
    pub product_id: Option<String>,
    pub store: Option<String>,
    pub period_type: Option<String>,
    /// Epoch milliseconds.
    pub expiration_at: Option<i64>,
    pub grace_period_expires_at: Option<i64>,
    /// Epoch milliseconds; drives the ordering guard.
    pub event_at: i64,
    /// Full raw event object, stored verbatim on the event record.
    pub payload: Value,
}

/// Extract and normalize a webhook body.
///
/// The canonical `app_user_id` is filled with the raw id; the caller
/// resolves it before applying the event. Fails only on the two required
/// fields; everything else degrades to absent.
pub fn normalize(body: &Value) -> Result<NormalizedEvent> {
    let event = match body.get("event") {
        Some(Value::Object(_)) => body.get("event").unwrap(),
        _ => body,
    };
    if !event.is_object() {
        return Err(AppError::BadRequest("event payload must be an object".to_string()));
    }

    let event_id = non_empty_str(event, "id")
        .ok_or_else(|| AppError::BadRequest("event id is required".to_string()))?;
    let raw_app_user_id = non_empty_str(event, "app_user_id")
        .ok_or_else(|| AppError::BadRequest("app_user_id is required".to_string()))?;

    let event_type = event
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_EVENT_TYPE);

    let mut entitlement_ids: Vec<String> = event
        .get("entitlement_ids")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    entitlement_ids.sort();
    entitlement_ids.dedup();

    let entitlement_id = non_empty_str(event, "entitlement_id")
        .or_else(|| entitlement_ids.first().cloned());

    let event_at = parse_timestamp(event.get("event_timestamp_ms"))
        .or_else(|| parse_timestamp(event.get("purchased_at_ms")))
        .unwrap_or_else(now_millis);

    Ok(NormalizedEvent {
        event_id,
        event_type: EventType::from_raw(event_type),
        app_user_id: raw_app_user_id.clone(),
        raw_app_user_id,
        entitlement_id,
        entitlement_ids,
        product_id: non_empty_str(event, "product_id"),
        store: non_empty_str(event, "store"),
        period_type: non_empty_str(event, "period_type"),
        expiration_at: parse_timestamp(event.get("expiration_at_ms")),
        grace_period_expires_at: parse_timestamp(event.get("grace_period_expiration_at_ms")),
        event_at,
        payload: event.clone(),
    })
}

fn non_empty_str(event: &Value, key: &str) -> Option<String> {
    event
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Timestamps arrive as epoch milliseconds or ISO-8601 strings; a naive
/// string is taken as UTC. Anything unparseable is treated as absent.
pub fn parse_timestamp(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc).timestamp_millis());
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc().timestamp_millis())
        }
        _ => None,
    }
}
