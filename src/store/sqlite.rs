//! SQLite-backed document store.
//!
//! One `documents` table keyed by (collection, id) with the fields as a JSON
//! blob. SQLite serializes writers, so `INSERT OR IGNORE` gives a genuinely
//! atomic create-if-absent and an immediate transaction makes the
//! read-merge-write in `merge_set` atomic per document.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;

use super::{Document, DocumentStore, StoreError};

pub type StorePool = Pool<SqliteConnectionManager>;

pub fn create_pool(database_path: &str) -> Result<StorePool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: StorePool,
}

impl SqliteStore {
    pub fn new(pool: StorePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                fields TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );
            CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }
}

fn parse_fields(collection: &str, id: &str, raw: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Corrupt {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: "fields is not a JSON object".to_string(),
        }),
        Err(e) => Err(StoreError::Corrupt {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn get_in(
    conn: &Connection,
    collection: &str,
    id: &str,
) -> Result<Option<Document>, StoreError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT fields FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;
    match raw {
        Some(raw) => Ok(Some(parse_fields(collection, id, &raw)?)),
        None => Ok(None),
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.conn()?;
        get_in(&conn, collection, id)
    }

    fn merge_set(&self, collection: &str, id: &str, fields: &Document) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut merged = get_in(&tx, collection, id)?.unwrap_or_default();
        for (k, v) in fields {
            if v.is_null() {
                merged.remove(k);
            } else {
                merged.insert(k.clone(), v.clone());
            }
        }
        let raw = serde_json::to_string(&Value::Object(merged))
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        tx.execute(
            "INSERT INTO documents (collection, id, fields) VALUES (?1, ?2, ?3)
             ON CONFLICT(collection, id) DO UPDATE SET fields = excluded.fields",
            params![collection, id, raw],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn create_if_absent(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let raw = serde_json::to_string(&Value::Object(fields.clone()))
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let affected = conn.execute(
            "INSERT OR IGNORE INTO documents (collection, id, fields) VALUES (?1, ?2, ?3)",
            params![collection, id, raw],
        )?;
        Ok(affected > 0)
    }

    fn query_by_equality(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let all = self.list(collection)?;
        Ok(all
            .into_iter()
            .filter(|(_, doc)| doc.get(field) == Some(value))
            .collect())
    }

    fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, fields FROM documents WHERE collection = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, raw) = row?;
            let doc = parse_fields(collection, &id, &raw)?;
            docs.push((id, doc));
        }
        Ok(docs)
    }

    fn list_collections(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let mut stmt = conn.prepare(
            "SELECT DISTINCT collection FROM documents
             WHERE collection LIKE ?1 ESCAPE '\\' ORDER BY collection",
        )?;
        let rows = stmt.query_map(params![pattern], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(())
    }
}
