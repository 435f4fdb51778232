//! SQLite schema DDL and version stamp.

use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::{AgreementError, AgreementResult};

/// Version written to `store_meta` by [`apply_schema`].
pub const SCHEMA_VERSION: i32 = 1;

/// Tables and indexes, all `IF NOT EXISTS` so they can be replayed on an
/// initialised database.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS store_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS annotations (
        name TEXT PRIMARY KEY,
        dataset TEXT NOT NULL,
        payload_json TEXT NOT NULL,
        updated_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS agreements (
        name TEXT PRIMARY KEY,
        dataset TEXT NOT NULL,
        is_completed INTEGER NOT NULL DEFAULT 0,
        payload_json TEXT NOT NULL,
        updated_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS tore_categories (
        name TEXT PRIMARY KEY,
        position INTEGER NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS relationship_names (
        name TEXT PRIMARY KEY,
        position INTEGER NOT NULL
    );",
    "CREATE INDEX IF NOT EXISTS idx_annotations_dataset ON annotations(dataset);",
    "CREATE INDEX IF NOT EXISTS idx_agreements_completed ON agreements(dataset, is_completed);",
];

/// Create every table and index, then stamp [`SCHEMA_VERSION`].
///
/// A database stamped by a newer build is refused before anything is
/// written to it.
pub fn apply_schema(conn: &Connection) -> AgreementResult<()> {
    conn.execute_batch(SCHEMA_STATEMENTS[0])?;
    if let Some(stored) = get_schema_version(conn)? {
        if stored > SCHEMA_VERSION {
            return Err(AgreementError::Store(format!(
                "database schema version {stored} is newer than supported version {SCHEMA_VERSION}"
            )));
        }
    }

    for stmt in &SCHEMA_STATEMENTS[1..] {
        conn.execute_batch(stmt)?;
    }
    conn.execute(
        "INSERT INTO store_meta(key, value) VALUES ('schema_version', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        params![SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

/// Stamped schema version, `None` on a fresh database.
pub fn get_schema_version(conn: &Connection) -> AgreementResult<Option<i32>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = 'schema_version';",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match value {
        Some(text) => text
            .parse::<i32>()
            .map(Some)
            .map_err(|_| AgreementError::Store(format!("unreadable schema version '{text}'"))),
        None => Ok(None),
    }
}
