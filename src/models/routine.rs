use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::store::Document;
use crate::util::now_millis;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// Task duration in seconds.
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub is_completed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineUpsert {
    pub routine_time: Option<String>,
    pub tasks: Option<Vec<RoutineTask>>,
}

impl RoutineUpsert {
    pub fn into_document(self) -> Document {
        let mut doc = Document::new();
        if let Some(v) = self.routine_time {
            doc.insert("routineTime".to_string(), json!(v));
        }
        if let Some(v) = self.tasks {
            doc.insert("tasks".to_string(), json!(v));
        }
        doc.insert("updatedAt".to_string(), json!(now_millis()));
        doc
    }
}
