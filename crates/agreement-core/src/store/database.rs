//! SQLite storage layer for annotations, agreements, and vocabularies.
//!
//! Each public method opens its own connection so that the caller never has
//! to manage connection lifetime, and so that parallel readers do not share
//! one.  Annotations and agreements are stored as JSON documents keyed by
//! name.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rayon::prelude::*;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::errors::{AgreementError, AgreementResult};
use crate::models::{Agreement, Annotation};
use crate::store::schema;
use crate::store::{AnnotationStore, VocabularyStore};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            if path.len() > 2 {
                expanded.push(&path[2..]);
            }
            return expanded;
        }
    }
    PathBuf::from(path)
}

/// SQLite document store.
#[derive(Clone, Debug)]
pub struct Database {
    db_path: PathBuf,
}

impl Database {
    /// Create a new `Database`.  The path is expanded and parent directories
    /// are created if they do not already exist.
    pub fn new(db_path: impl AsRef<Path>) -> AgreementResult<Self> {
        let db_str = db_path.as_ref().to_string_lossy();
        let expanded = expand_tilde(&db_str);
        let resolved = if expanded.is_absolute() {
            expanded
        } else {
            std::env::current_dir()?.join(&expanded)
        };
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { db_path: resolved })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> AgreementResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Switch to WAL and create the schema.
    pub fn init_schema(&self) -> AgreementResult<()> {
        let conn = self.connect()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        schema::apply_schema(&conn)
    }

    fn load_payload<T: DeserializeOwned>(&self, sql: &str, kind: &str, name: &str) -> AgreementResult<T> {
        let conn = self.connect()?;
        let payload: Option<String> = conn
            .query_row(sql, params![name], |row| row.get(0))
            .optional()?;
        match payload {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(AgreementError::not_found(kind, name)),
        }
    }

    fn replace_names(&self, table: &str, names: &[String]) -> AgreementResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(&format!("DELETE FROM {table};"), [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO {table}(name, position) VALUES (?1, ?2);"
            ))?;
            for (position, name) in names.iter().enumerate() {
                stmt.execute(params![name, position as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_names(&self, table: &str) -> AgreementResult<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT name FROM {table} ORDER BY position;"))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Replace the known category labels.
    pub fn set_categories(&self, categories: &[String]) -> AgreementResult<()> {
        self.replace_names("tore_categories", categories)
    }

    /// Replace the known relationship names.
    pub fn set_relationship_names(&self, names: &[String]) -> AgreementResult<()> {
        self.replace_names("relationship_names", names)
    }

    /// Names of stored annotations, optionally restricted to one dataset.
    pub fn list_annotation_names(&self, dataset: Option<&str>) -> AgreementResult<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM annotations \
             WHERE (?1 IS NULL OR dataset = ?1) ORDER BY name;",
        )?;
        let names = stmt
            .query_map(params![dataset], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

impl AnnotationStore for Database {
    fn get_annotation(&self, name: &str) -> AgreementResult<Annotation> {
        debug!("Loading annotation '{name}'");
        self.load_payload(
            "SELECT payload_json FROM annotations WHERE name = ?1 LIMIT 1;",
            "annotation",
            name,
        )
    }

    fn get_agreement(&self, name: &str) -> AgreementResult<Agreement> {
        debug!("Loading agreement '{name}'");
        self.load_payload(
            "SELECT payload_json FROM agreements WHERE name = ?1 LIMIT 1;",
            "agreement",
            name,
        )
    }

    fn store_annotation(&self, annotation: &Annotation) -> AgreementResult<()> {
        let payload = serde_json::to_string(annotation)?;
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO annotations(name, dataset, payload_json) VALUES (?1, ?2, ?3) \
             ON CONFLICT(name) DO UPDATE SET \
                 dataset = excluded.dataset, \
                 payload_json = excluded.payload_json, \
                 updated_at = CURRENT_TIMESTAMP;",
            params![annotation.name, annotation.dataset, payload],
        )?;
        info!("Stored annotation '{}'", annotation.name);
        Ok(())
    }

    fn store_agreement(&self, agreement: &Agreement) -> AgreementResult<()> {
        let payload = serde_json::to_string(agreement)?;
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO agreements(name, dataset, is_completed, payload_json) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(name) DO UPDATE SET \
                 dataset = excluded.dataset, \
                 is_completed = excluded.is_completed, \
                 payload_json = excluded.payload_json, \
                 updated_at = CURRENT_TIMESTAMP;",
            params![agreement.name, agreement.dataset, agreement.is_completed, payload],
        )?;
        info!("Stored agreement '{}'", agreement.name);
        Ok(())
    }

    /// Fetch annotations in parallel, one connection per worker.
    fn get_annotations(&self, names: &[String]) -> AgreementResult<Vec<Annotation>> {
        names
            .par_iter()
            .map(|name| self.get_annotation(name))
            .collect()
    }
}

impl VocabularyStore for Database {
    fn get_all_categories(&self) -> AgreementResult<Vec<String>> {
        self.list_names("tore_categories")
    }

    fn get_all_relationship_names(&self) -> AgreementResult<Vec<String>> {
        self.list_names("relationship_names")
    }
}
