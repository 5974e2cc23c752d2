//! In-memory document store.
//!
//! Used by tests and by `--ephemeral` dev mode. The mutex makes
//! `create_if_absent` a real atomic primitive, not a read-then-write
//! approximation, so race-condition tests exercise the same winning-create
//! semantics as the SQLite store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

use super::{Document, DocumentStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, BTreeMap<String, Document>>> {
        // A poisoned lock means a panic mid-write; tests should fail loudly.
        self.collections.lock().expect("memory store lock poisoned")
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.lock();
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn merge_set(&self, collection: &str, id: &str, fields: &Document) -> Result<(), StoreError> {
        let mut guard = self.lock();
        let doc = guard
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        for (k, v) in fields {
            if v.is_null() {
                doc.remove(k);
            } else {
                doc.insert(k.clone(), v.clone());
            }
        }
        Ok(())
    }

    fn create_if_absent(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
    ) -> Result<bool, StoreError> {
        let mut guard = self.lock();
        let docs = guard.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Ok(false);
        }
        docs.insert(id.to_string(), fields.clone());
        Ok(true)
    }

    fn query_by_equality(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let guard = self.lock();
        Ok(guard
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| doc.get(field) == Some(value))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let guard = self.lock();
        Ok(guard
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_collections(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let guard = self.lock();
        Ok(guard
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.lock();
        if let Some(docs) = guard.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}
