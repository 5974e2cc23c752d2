use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::store::Document;
use crate::util::{now_millis, today_utc};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgressUpsert {
    /// yyyy-mm-dd; defaults to today (UTC).
    pub date: Option<String>,
    pub completed: Option<i64>,
    pub total: Option<i64>,
    #[serde(default)]
    pub completed_task_ids: Vec<String>,
}

impl DailyProgressUpsert {
    /// Validate and produce the document id (the date) and fields.
    pub fn into_document(self) -> Result<(String, Document)> {
        let date = self.date.unwrap_or_else(today_utc);
        if NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_err() {
            return Err(AppError::BadRequest("date must be yyyy-mm-dd".to_string()));
        }

        let completed = match self.completed {
            Some(n) if n >= 0 => n,
            _ => {
                return Err(AppError::BadRequest(
                    "completed must be a non-negative integer".to_string(),
                ))
            }
        };
        let total = match self.total {
            Some(n) if n >= 0 => n,
            _ => {
                return Err(AppError::BadRequest(
                    "total must be a non-negative integer".to_string(),
                ))
            }
        };

        let mut doc = Document::new();
        doc.insert("date".to_string(), json!(date));
        doc.insert("completed".to_string(), json!(completed));
        doc.insert("total".to_string(), json!(total));
        doc.insert("completedTaskIds".to_string(), json!(self.completed_task_ids));
        doc.insert("updatedAt".to_string(), json!(now_millis()));
        Ok((date, doc))
    }
}
