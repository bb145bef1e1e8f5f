//! Catalog schema and migrations, versioned through `PRAGMA user_version`.

use rusqlite::Connection;

use super::error::CatalogError;

pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS setting (
    name TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS champion (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    title TEXT NOT NULL,
    lore TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS skin (
    id INTEGER PRIMARY KEY NOT NULL,
    number INTEGER NOT NULL,
    name TEXT NOT NULL,
    champion_id TEXT NOT NULL REFERENCES champion(id),
    UNIQUE (champion_id, number)
);

CREATE INDEX IF NOT EXISTS idx_skin_champion ON skin(champion_id);

CREATE TABLE IF NOT EXISTS sync_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version TEXT NOT NULL,
    started_at INTEGER NOT NULL,
    completed_at INTEGER,
    champions_total INTEGER DEFAULT 0,
    champions_failed INTEGER DEFAULT 0,
    skins_synced INTEGER DEFAULT 0,
    skins_failed INTEGER DEFAULT 0,
    images_failed INTEGER DEFAULT 0
);
"#;

pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32, CatalogError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|source| CatalogError::Migration {
            target: SCHEMA_VERSION,
            source,
        })
}

/// Create or upgrade the schema. Safe to call on every open.
pub(crate) fn migrate(conn: &Connection) -> Result<(), CatalogError> {
    let current = get_schema_version(conn)?;

    if current > SCHEMA_VERSION {
        return Err(CatalogError::UnsupportedSchemaVersion {
            found: current,
            expected: SCHEMA_VERSION,
        });
    }

    if current < SCHEMA_VERSION {
        conn.execute_batch(SCHEMA_V1)
            .and_then(|()| conn.pragma_update(None, "user_version", SCHEMA_VERSION))
            .map_err(|source| CatalogError::Migration {
                target: SCHEMA_VERSION,
                source,
            })?;
        tracing::debug!(from = current, to = SCHEMA_VERSION, "Migrated catalog schema");
    }

    Ok(())
}
