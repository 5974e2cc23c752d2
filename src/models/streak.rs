use serde::Deserialize;
use serde_json::json;

use crate::store::Document;
use crate::util::now_millis;

/// Client-computed streak snapshot, stored as-is under stats/streak.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakUpsert {
    pub current_streak: Option<i64>,
    pub longest_streak: Option<i64>,
    /// Last yyyy-mm-dd that counted toward the streak.
    pub last_qualified_date: Option<String>,
}

impl StreakUpsert {
    pub fn into_document(self) -> Document {
        let mut doc = Document::new();
        if let Some(v) = self.current_streak {
            doc.insert("currentStreak".to_string(), json!(v));
        }
        if let Some(v) = self.longest_streak {
            doc.insert("longestStreak".to_string(), json!(v));
        }
        if let Some(v) = self.last_qualified_date {
            doc.insert("lastQualifiedDate".to_string(), json!(v));
        }
        doc.insert("updatedAt".to_string(), json!(now_millis()));
        doc
    }
}
