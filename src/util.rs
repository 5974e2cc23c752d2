//! Shared helpers.

use chrono::Utc;

/// Current time as epoch milliseconds; all stored timestamps use this unit.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Today's date in UTC as yyyy-mm-dd (daily-progress document ids).
pub fn today_utc() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Canonical form of an email address for alias lookup: trimmed, lowercased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
