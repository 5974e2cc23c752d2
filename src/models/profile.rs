use serde::Deserialize;
use serde_json::json;

use crate::store::Document;
use crate::util::now_millis;

/// Client-writable profile fields. Anything not listed here is dropped on
/// the floor, not rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpsert {
    pub nickname: Option<String>,
    pub age_group: Option<String>,
    pub gender: Option<String>,
    pub notifications_enabled: Option<bool>,
    pub terms_accepted: Option<bool>,
    pub terms_over16_accepted: Option<bool>,
    pub terms_marketing_accepted: Option<bool>,
    pub payment_option: Option<String>,
}

impl ProfileUpsert {
    /// Only the fields present in the request, plus the update stamp.
    pub fn into_document(self) -> Document {
        let mut doc = Document::new();
        if let Some(v) = self.nickname {
            doc.insert("nickname".to_string(), json!(v));
        }
        if let Some(v) = self.age_group {
            doc.insert("ageGroup".to_string(), json!(v));
        }
        if let Some(v) = self.gender {
            doc.insert("gender".to_string(), json!(v));
        }
        if let Some(v) = self.notifications_enabled {
            doc.insert("notificationsEnabled".to_string(), json!(v));
        }
        if let Some(v) = self.terms_accepted {
            doc.insert("termsAccepted".to_string(), json!(v));
        }
        if let Some(v) = self.terms_over16_accepted {
            doc.insert("termsOver16Accepted".to_string(), json!(v));
        }
        if let Some(v) = self.terms_marketing_accepted {
            doc.insert("termsMarketingAccepted".to_string(), json!(v));
        }
        if let Some(v) = self.payment_option {
            doc.insert("paymentOption".to_string(), json!(v));
        }
        doc.insert("updatedAt".to_string(), json!(now_millis()));
        doc
    }
}
