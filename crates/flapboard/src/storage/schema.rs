//! `SQLite` schema definitions for flapboard.
//!
//! Every record collection lives in one `documents` table as a JSON body
//! tagged with its collection name.

/// SQL statement to create the documents table.
pub const CREATE_DOCUMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create an index on collection for scoped queries.
pub const CREATE_COLLECTION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_DOCUMENTS_TABLE,
    CREATE_COLLECTION_INDEX,
    CREATE_METADATA_TABLE,
];
