//! Storage layer for flapboard.
//!
//! This module provides a small `SQLite`-backed document store: each
//! record collection is a set of JSON documents, queried by collection
//! and, optionally, by equality on one top-level field.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::records::Record;

/// A stored JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned identifier, increasing with insertion order.
    pub id: i64,
    /// Collection the document belongs to.
    pub collection: String,
    /// The document's fields.
    pub body: Map<String, Value>,
    /// When the document was inserted.
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Decode into a record. Missing or `null` fields take the record's
    /// defaults (empty strings).
    ///
    /// # Errors
    ///
    /// Returns an error if a present field has the wrong type.
    pub fn decode<T: Record>(&self) -> Result<T> {
        let body: Map<String, Value> = self
            .body
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let record: T = serde_json::from_value(Value::Object(body))?;
        Ok(record.with_id(self.id))
    }
}

/// Field filter for document queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Query {
    /// Every document in the collection.
    #[default]
    All,
    /// Documents whose top-level `field` equals `value`.
    Eq {
        /// Field name.
        field: String,
        /// Value to compare with.
        value: Value,
    },
}

impl Query {
    /// Match every document.
    #[must_use]
    pub fn all() -> Self {
        Self::All
    }

    /// Match documents where `field == value`.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// The SQL condition and its bound value, if any.
    fn condition(&self) -> Result<(String, Option<SqlValue>)> {
        match self {
            Self::All => Ok((String::new(), None)),
            Self::Eq { field, value } => {
                if !field_pattern().is_match(field) {
                    return Err(Error::InvalidQueryField {
                        field: field.clone(),
                    });
                }
                Ok((
                    format!(" AND json_extract(body, '$.{field}') IS ?2"),
                    Some(to_sql_value(value)),
                ))
            }
        }
    }
}

/// Ordering by insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

impl SortOrder {
    const fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex pattern"))
}

/// Map a JSON value to what `json_extract` yields for it.
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Serialize a document body. Bodies must be JSON objects; a top-level
/// `id` is dropped because the store assigns identifiers.
fn to_body(doc: &impl Serialize) -> Result<String> {
    match serde_json::to_value(doc)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(Value::Object(map).to_string())
        }
        other => Err(Error::internal(format!(
            "documents must be JSON objects, got {other}"
        ))),
    }
}

/// Raw row: id, collection, body, `created_at`.
type DocumentRow = (i64, String, String, String);

fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<DocumentRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn raw_to_document((id, collection, body, created_at): DocumentRow) -> Result<Document> {
    let body = match serde_json::from_str(&body)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));
    Ok(Document {
        id,
        collection,
        body,
        created_at,
    })
}

/// `SQLite`-backed document store.
#[derive(Debug)]
pub struct DocumentStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl DocumentStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All matching documents, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is invalid or the database operation fails.
    pub fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        self.select(collection, query, SortOrder::Ascending, None)
    }

    /// The first matching document in the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is invalid or the database operation fails.
    pub fn find_one(
        &self,
        collection: &str,
        query: &Query,
        order: SortOrder,
    ) -> Result<Option<Document>> {
        Ok(self
            .select(collection, query, order, Some(1))?
            .into_iter()
            .next())
    }

    fn select(
        &self,
        collection: &str,
        query: &Query,
        order: SortOrder,
        limit: Option<i64>,
    ) -> Result<Vec<Document>> {
        let (condition, value) = query.condition()?;
        let sql = format!(
            "SELECT id, collection, body, created_at FROM documents \
             WHERE collection = ?1{condition} ORDER BY id {} LIMIT {}",
            order.sql(),
            limit.unwrap_or(-1)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match value {
            Some(value) => stmt
                .query_map(params![collection, value], row_to_raw)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([collection], row_to_raw)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };
        rows.into_iter().map(raw_to_document).collect()
    }

    /// Insert one document and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a JSON object or the
    /// database operation fails.
    pub fn insert_one(&self, collection: &str, doc: &impl Serialize) -> Result<i64> {
        let body = to_body(doc)?;
        self.conn.execute(
            "INSERT INTO documents (collection, body, created_at) VALUES (?1, ?2, ?3)",
            params![collection, body, Utc::now().to_rfc3339()],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(collection, id, "Inserted document");
        Ok(id)
    }

    /// Insert several documents atomically, returning their ids in order.
    ///
    /// # Errors
    ///
    /// Returns an error if any document is not a JSON object or the
    /// database operation fails; nothing is inserted in that case.
    pub fn insert_many<T: Serialize>(&self, collection: &str, docs: &[T]) -> Result<Vec<i64>> {
        let tx = self.conn.unchecked_transaction()?;
        let ids = docs
            .iter()
            .map(|doc| self.insert_one(collection, doc))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(ids)
    }

    /// Delete one document by id. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_one(&self, collection: &str, id: i64) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(affected > 0)
    }

    /// Delete every matching document. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is invalid or the database operation fails.
    pub fn delete_many(&self, collection: &str, query: &Query) -> Result<usize> {
        let (condition, value) = query.condition()?;
        let sql = format!("DELETE FROM documents WHERE collection = ?1{condition}");
        let affected = match value {
            Some(value) => self.conn.execute(&sql, params![collection, value])?,
            None => self.conn.execute(&sql, [collection])?,
        };
        if affected > 0 {
            debug!(collection, affected, "Deleted documents");
        }
        Ok(affected)
    }

    /// Replace a whole collection with `docs` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any document is not a JSON object or the
    /// database operation fails; the collection is left unchanged then.
    pub fn replace_all<T: Serialize>(&self, collection: &str, docs: &[T]) -> Result<Vec<i64>> {
        let tx = self.conn.unchecked_transaction()?;
        self.conn
            .execute("DELETE FROM documents WHERE collection = ?1", [collection])?;
        let ids = docs
            .iter()
            .map(|doc| self.insert_one(collection, doc))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        info!(collection, count = ids.len(), "Replaced collection");
        Ok(ids)
    }

    /// Count documents in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self, collection: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Fetch one document by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, collection: &str, id: i64) -> Result<Option<Document>> {
        self.conn
            .query_row(
                "SELECT id, collection, body, created_at FROM documents \
                 WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                row_to_raw,
            )
            .optional()?
            .map(raw_to_document)
            .transpose()
    }

    /// Run raw SQL against the connection.
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}
