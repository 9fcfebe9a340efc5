//! SQLite schema for the document store
//!
//! Five tables: three entities and two junction tables. Junction rows
//! reference their parents with `ON DELETE CASCADE`, so deleting a
//! document, tag or image also drops its links. Foreign keys are only
//! enforced on connections that enable `PRAGMA foreign_keys`.

use rusqlite::{Connection, Result};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS document (
            documentId INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT
        );

        -- Tag names are deliberately not unique
        CREATE TABLE IF NOT EXISTS tag (
            tagId INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT
        );

        CREATE TABLE IF NOT EXISTS image (
            imageId INTEGER PRIMARY KEY AUTOINCREMENT,
            uri TEXT NOT NULL
        );

        -- Document-tag junction table (many-to-many)
        CREATE TABLE IF NOT EXISTS documentTagRelation (
            documentId INTEGER NOT NULL,
            tagId INTEGER NOT NULL,
            PRIMARY KEY (documentId, tagId),
            FOREIGN KEY (documentId) REFERENCES document(documentId) ON DELETE CASCADE,
            FOREIGN KEY (tagId) REFERENCES tag(tagId) ON DELETE CASCADE
        );

        -- Document-image junction table (many-to-many)
        CREATE TABLE IF NOT EXISTS documentImageRelation (
            documentId INTEGER NOT NULL,
            imageId INTEGER NOT NULL,
            PRIMARY KEY (documentId, imageId),
            FOREIGN KEY (documentId) REFERENCES document(documentId) ON DELETE CASCADE,
            FOREIGN KEY (imageId) REFERENCES image(imageId) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS index_documentTagRelation_documentId
            ON documentTagRelation(documentId);
        CREATE INDEX IF NOT EXISTS index_documentTagRelation_tagId
            ON documentTagRelation(tagId);
        CREATE INDEX IF NOT EXISTS index_documentImageRelation_documentId
            ON documentImageRelation(documentId);
        CREATE INDEX IF NOT EXISTS index_documentImageRelation_imageId
            ON documentImageRelation(imageId);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
