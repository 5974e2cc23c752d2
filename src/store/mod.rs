//! Document store abstraction.
//!
//! Every user-owned record (profile, routine, progress, subscription) and
//! every identity alias lives in a collection of JSON documents keyed by a
//! string id. The store exposes exactly one atomicity primitive,
//! [`DocumentStore::create_if_absent`]; all concurrency control in the
//! identity and billing paths reduces to "first successful create wins".

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{create_pool, SqliteStore, StorePool};

use serde_json::{Map, Value};
use thiserror::Error;

/// A stored document: a flat JSON object.
pub type Document = Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Corrupt document at {collection}/{id}: {reason}")]
    Corrupt {
        collection: String,
        id: String,
        reason: String,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(e: r2d2::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

/// Per-collection document storage with merge-upsert and atomic
/// create-if-absent.
///
/// Calls are blocking from the caller's point of view and are not retried;
/// transport errors surface immediately.
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` if absent.
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Upsert: set the given fields, preserving any fields not mentioned.
    /// A `null` value deletes that field from the document.
    fn merge_set(&self, collection: &str, id: &str, fields: &Document) -> Result<(), StoreError>;

    /// Atomically create the document if and only if the id is free.
    /// Returns `true` if this call created it, `false` if it already existed.
    fn create_if_absent(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
    ) -> Result<bool, StoreError>;

    /// All documents in a collection whose top-level `field` equals `value`.
    fn query_by_equality(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>, StoreError>;

    /// List every document in a collection.
    fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError>;

    /// List collection names starting with the given prefix.
    fn list_collections(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Delete a document. Deleting an absent document is not an error.
    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Collection/document paths, mirroring the mobile app's document hierarchy.
pub mod paths {
    pub const EMAIL_ALIASES: &str = "user_email_aliases";
    pub const UID_ALIASES: &str = "user_uid_aliases";
    pub const WEBHOOK_EVENTS: &str = "payments/revenuecat/events";

    pub fn profile(uid: &str) -> String {
        format!("users/{uid}/profile")
    }
    pub const PROFILE_DOC: &str = "self";

    pub fn routine(uid: &str) -> String {
        format!("users/{uid}/routine")
    }
    pub const ROUTINE_DOC: &str = "current";

    pub fn progress(uid: &str) -> String {
        format!("users/{uid}/progress")
    }

    pub fn stats(uid: &str) -> String {
        format!("users/{uid}/stats")
    }
    pub const STREAK_DOC: &str = "streak";

    pub fn payments(uid: &str) -> String {
        format!("users/{uid}/payments")
    }
    pub const SUBSCRIPTION_DOC: &str = "subscription";
}
