//! Error types for the catalog store.

use std::path::PathBuf;

use rusqlite::ffi;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// The database file could not be opened or configured.
    #[error("Failed to open catalog at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("Catalog migration to schema version {target} failed: {source}")]
    Migration {
        target: i32,
        source: rusqlite::Error,
    },

    #[error("Catalog schema version {found} is newer than supported version {expected}")]
    UnsupportedSchemaVersion { found: i32, expected: i32 },

    #[error("Query on catalog table '{table}' failed: {source}")]
    Query {
        table: &'static str,
        source: rusqlite::Error,
    },

    #[error("Champion '{champion_id}' already has a skin numbered {number} (rejected skin {skin_id})")]
    DuplicateSkinNumber {
        skin_id: u32,
        champion_id: String,
        number: u32,
    },

    #[error("Skin {skin_id} refers to champion '{champion_id}', which is not in the catalog")]
    UnknownChampion { skin_id: u32, champion_id: String },

    #[error("Catalog connection lock poisoned")]
    Poisoned,

    #[error("Catalog open task failed: {0}")]
    Spawn(#[from] tokio::task::JoinError),
}

impl CatalogError {
    /// `map_err` adapter tagging a failure with the table it touched.
    pub(crate) fn query(table: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Query { table, source }
    }
}

/// Extended SQLite result code of a failed statement, if it has one.
pub(crate) fn constraint_code(error: &rusqlite::Error) -> Option<i32> {
    match error {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ffi::ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    }
}

pub(crate) const UNIQUE_VIOLATION: i32 = ffi::SQLITE_CONSTRAINT_UNIQUE;
pub(crate) const FOREIGN_KEY_VIOLATION: i32 = ffi::SQLITE_CONSTRAINT_FOREIGNKEY;
