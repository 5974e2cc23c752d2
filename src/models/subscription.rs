use serde::Deserialize;
use serde_json::json;

use crate::store::Document;
use crate::util::now_millis;

/// Data-source tag for webhook-originated snapshot updates.
pub const SOURCE_WEBHOOK: &str = "revenuecat_webhook";
/// Data-source tag for snapshots reported by the app itself.
pub const SOURCE_APP_REPORT: &str = "app_report";

/// App-reported subscription snapshot (client-side receipt validation).
///
/// Lower trust than the webhook path: restricted to this allow-listed field
/// set and never writes `latestEventAt`, so it can never suppress a
/// properly ordered webhook update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotReport {
    pub entitlement_id: Option<String>,
    #[serde(default)]
    pub entitlement_ids: Vec<String>,
    pub is_active: Option<bool>,
    pub product_id: Option<String>,
    pub payment_option: Option<String>,
    pub store: Option<String>,
    pub period_type: Option<String>,
    /// Epoch milliseconds.
    pub expiration_at: Option<i64>,
    pub grace_period_expires_at: Option<i64>,
}

impl SnapshotReport {
    pub fn into_document(self) -> Document {
        let mut doc = Document::new();
        doc.insert("provider".to_string(), json!("app"));
        doc.insert("entitlementId".to_string(), json!(self.entitlement_id));
        doc.insert("entitlementIds".to_string(), json!(self.entitlement_ids));
        if let Some(v) = self.is_active {
            doc.insert("isActive".to_string(), json!(v));
        }
        if let Some(v) = self.product_id {
            doc.insert("productId".to_string(), json!(v));
        }
        if let Some(v) = self.payment_option {
            doc.insert("paymentOption".to_string(), json!(v));
        }
        if let Some(v) = self.store {
            doc.insert("store".to_string(), json!(v));
        }
        if let Some(v) = self.period_type {
            doc.insert("periodType".to_string(), json!(v));
        }
        if let Some(v) = self.expiration_at {
            doc.insert("expirationAt".to_string(), json!(v));
        }
        if let Some(v) = self.grace_period_expires_at {
            doc.insert("gracePeriodExpiresAt".to_string(), json!(v));
        }
        doc.insert("dataSource".to_string(), json!(SOURCE_APP_REPORT));
        doc.insert("updatedAt".to_string(), json!(now_millis()));
        doc
    }
}
