// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Document store: user profiles and heritage records
//!
//! Records are schemaless JSON documents addressed by `(collection, id)`.
//! The [`DocumentStore`] trait is what the sign-up and enrichment flows
//! depend on; [`Database`] implements it on SQLite.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

use crate::{Result, TurathError};

/// A stored document body
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Equality-query and write capability of a document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in `collection` whose string `field` equals `value`,
    /// in insertion order
    async fn query(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>>;

    /// Create or overwrite the document `id` in `collection`
    async fn write_document(&self, collection: &str, id: &str, fields: Document) -> Result<()>;
}

/// SQLite-backed document store (thread-safe wrapper)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Per-collection document count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub name: String,
    pub document_count: i64,
}

/// Database statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub document_count: i64,
    pub collections: Vec<CollectionStats>,
}

impl Database {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize()?;
        Ok(db)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| TurathError::Query("Database lock poisoned".to_string()))
    }

    /// Initialize database schema
    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
        "#)?;
        Ok(())
    }

    /// Equality query on a top-level string field
    pub fn find_by_field(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>> {
        let path = field_path(field)?;
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT body FROM documents
               WHERE collection = ?1 AND json_extract(body, ?2) = ?3
               ORDER BY rowid"#
        )?;
        let bodies = stmt.query_map(params![collection, path, value], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Query {}.{} matched {} documents", collection, field, bodies.len());
        bodies.iter().map(|body| parse_body(body)).collect()
    }

    /// Insert or overwrite a document, keeping its creation time
    pub fn put_document(&self, collection: &str, id: &str, fields: &Document) -> Result<()> {
        if id.is_empty() {
            return Err(TurathError::Query("document id must not be empty".to_string()));
        }
        let conn = self.lock_conn()?;
        let body = serde_json::to_string(fields)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"INSERT INTO documents (collection, id, body, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?4)
               ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at"#,
            params![collection, id, body, now],
        )?;
        Ok(())
    }

    /// Fetch one document by id
    pub fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let conn = self.lock_conn()?;
        let body: Option<String> = conn.query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        ).optional()?;
        body.as_deref().map(parse_body).transpose()
    }

    /// List documents of a collection in insertion order
    pub fn list_documents(&self, collection: &str, limit: usize) -> Result<Vec<(String, Document)>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, body FROM documents WHERE collection = ?1 ORDER BY rowid LIMIT ?2"
        )?;
        let rows = stmt.query_map(params![collection, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?.collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, body)| Ok((id, parse_body(&body)?)))
            .collect()
    }

    /// Bulk-load documents, taking each id from `id_field` or generating one.
    /// Returns the number of documents written.
    pub fn import_documents(&self, collection: &str, id_field: &str, documents: &[Document]) -> Result<usize> {
        for document in documents {
            let id = document.get(id_field)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(new_document_id);
            self.put_document(collection, &id, document)?;
        }
        Ok(documents.len())
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DbStats> {
        let conn = self.lock_conn()?;
        let document_count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        let mut stmt = conn.prepare(
            "SELECT collection, COUNT(*) FROM documents GROUP BY collection ORDER BY collection"
        )?;
        let collections = stmt.query_map([], |row| {
            Ok(CollectionStats {
                name: row.get(0)?,
                document_count: row.get(1)?,
            })
        })?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(DbStats { document_count, collections })
    }

    /// Vacuum database
    pub fn vacuum(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("VACUUM", [])?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for Database {
    async fn query(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>> {
        self.find_by_field(collection, field, value)
    }

    async fn write_document(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        self.put_document(collection, id, &fields)
    }
}

/// JSON path for a top-level field; names are restricted so they can be quoted safely
fn field_path(field: &str) -> Result<String> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TurathError::Query(format!("invalid field name: {:?}", field)));
    }
    Ok(format!("$.\"{}\"", field))
}

fn parse_body(body: &str) -> Result<Document> {
    match serde_json::from_str(body)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(TurathError::Query(format!("stored document is not an object: {}", other))),
    }
}

/// Generate a new UUID for documents without a natural key
pub fn new_document_id() -> String {
    Uuid::new_v4().to_string()
}
