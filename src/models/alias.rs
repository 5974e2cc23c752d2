use serde::Deserialize;

use crate::store::Document;

/// Typed view of a `user_email_aliases` document. The document is created
/// exactly once per normalized email; `canonical_user_id` never changes
/// after that.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAlias {
    pub canonical_user_id: String,
    #[serde(default)]
    pub first_uid: Option<String>,
    #[serde(default)]
    pub last_uid: Option<String>,
    #[serde(default)]
    pub last_provider: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl EmailAlias {
    pub fn from_document(doc: &Document) -> Option<Self> {
        serde_json::from_value(serde_json::Value::Object(doc.clone())).ok()
    }
}

/// Typed view of a `user_uid_aliases` document (non-authoritative cache).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UidAlias {
    pub canonical_user_id: String,
    #[serde(default)]
    pub last_email: Option<String>,
    #[serde(default)]
    pub last_provider: Option<String>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl UidAlias {
    pub fn from_document(doc: &Document) -> Option<Self> {
        serde_json::from_value(serde_json::Value::Object(doc.clone())).ok()
    }
}
