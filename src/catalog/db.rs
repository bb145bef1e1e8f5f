//! Catalog store trait and SQLite implementation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};

use super::error::{constraint_code, CatalogError, FOREIGN_KEY_VIOLATION, UNIQUE_VIOLATION};
use super::schema;
use super::types::{CatalogSummary, Champion, Setting, Skin, SyncRunStats};

/// Key-addressed access to the catalog.
///
/// Object-safe so the updater and resolver can share an
/// `Arc<dyn CatalogStore>`. Every write is a single-row statement; there are
/// no cross-row transactions, and repeated upserts of the same key converge.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_setting(&self, setting: Setting) -> Result<Option<String>, CatalogError>;

    /// Insert or overwrite a setting.
    async fn set_setting(&self, setting: Setting, value: &str) -> Result<(), CatalogError>;

    async fn champion_exists(&self, id: &str) -> Result<bool, CatalogError>;

    /// Insert a new champion. Fails if the id is already stored.
    async fn create_champion(&self, champion: &Champion) -> Result<(), CatalogError>;

    async fn get_champion(&self, id: &str) -> Result<Option<Champion>, CatalogError>;

    /// All champions ordered by id.
    async fn list_champions(&self) -> Result<Vec<Champion>, CatalogError>;

    /// Skins of one champion ordered by number.
    async fn skins_for_champion(&self, champion_id: &str) -> Result<Vec<Skin>, CatalogError>;

    /// Skin numbers already stored for a champion.
    async fn skin_numbers(&self, champion_id: &str) -> Result<HashSet<u32>, CatalogError>;

    /// Insert or update a skin by id. Rejected if another skin of the same
    /// champion already holds `skin.number`.
    async fn upsert_skin(&self, skin: &Skin) -> Result<(), CatalogError>;

    async fn get_skin(&self, id: u32) -> Result<Option<Skin>, CatalogError>;

    /// Open a ledger entry for a sync of `version` and return its id.
    async fn start_sync_run(&self, version: &str) -> Result<i64, CatalogError>;

    async fn complete_sync_run(&self, run_id: i64, stats: &SyncRunStats)
        -> Result<(), CatalogError>;

    async fn get_summary(&self) -> Result<CatalogSummary, CatalogError>;
}

/// SQLite implementation of [`CatalogStore`].
pub struct SqliteCatalogStore {
    /// rusqlite::Connection is not Sync; every statement is short, so a
    /// plain mutex is enough.
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteCatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalogStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteCatalogStore {
    /// Open or create the catalog at `path`, applying migrations.
    pub async fn open(path: &Path) -> Result<Self, CatalogError> {
        let path = path.to_path_buf();
        let path_clone = path.clone();

        let conn = tokio::task::spawn_blocking(move || {
            if let Some(parent) = path_clone.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let conn = Connection::open(&path_clone).map_err(|e| CatalogError::Open {
                path: path_clone.clone(),
                source: e,
            })?;
            configure(&conn, &path_clone)?;
            conn.pragma_update(None, "journal_mode", "WAL")
                .and_then(|()| conn.pragma_update(None, "synchronous", "NORMAL"))
                .map_err(|e| CatalogError::Open {
                    path: path_clone.clone(),
                    source: e,
                })?;
            schema::migrate(&conn)?;
            Ok::<_, CatalogError>(conn)
        })
        .await??;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|e| CatalogError::Open {
            path: path.clone(),
            source: e,
        })?;
        configure(&conn, &path)?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn.lock().map_err(|_| CatalogError::Poisoned)
    }
}

fn configure(conn: &Connection, path: &Path) -> Result<(), CatalogError> {
    conn.pragma_update(None, "foreign_keys", "ON")
        // Concurrent skin tasks may briefly contend on the WAL writer lock.
        .and_then(|()| conn.busy_timeout(std::time::Duration::from_secs(5)))
        .map_err(|e| CatalogError::Open {
            path: path.to_path_buf(),
            source: e,
        })
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn get_setting(&self, setting: Setting) -> Result<Option<String>, CatalogError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM setting WHERE name = ?1",
            [setting.as_str()],
            |row| row.get(0),
        )
        .optional()
        .map_err(CatalogError::query("setting"))
    }

    async fn set_setting(&self, setting: Setting, value: &str) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO setting (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            [setting.as_str(), value],
        )
        .map_err(CatalogError::query("setting"))?;
        Ok(())
    }

    async fn champion_exists(&self, id: &str) -> Result<bool, CatalogError> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM champion WHERE id = ?1", [id], |row| row.get(0))
            .optional()
            .map_err(CatalogError::query("champion"))?;
        Ok(found.is_some())
    }

    async fn create_champion(&self, champion: &Champion) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO champion (id, name, title, lore) VALUES (?1, ?2, ?3, ?4)",
            [
                &champion.id,
                &champion.name,
                &champion.title,
                &champion.lore,
            ],
        )
        .map_err(CatalogError::query("champion"))?;
        Ok(())
    }

    async fn get_champion(&self, id: &str) -> Result<Option<Champion>, CatalogError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, title, lore FROM champion WHERE id = ?1",
            [id],
            row_to_champion,
        )
        .optional()
        .map_err(CatalogError::query("champion"))
    }

    async fn list_champions(&self) -> Result<Vec<Champion>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name, title, lore FROM champion ORDER BY id ASC")
            .map_err(CatalogError::query("champion"))?;
        let champions = stmt
            .query_map([], row_to_champion)
            .map_err(CatalogError::query("champion"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(CatalogError::query("champion"))?;
        Ok(champions)
    }

    async fn skins_for_champion(&self, champion_id: &str) -> Result<Vec<Skin>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, number, name, champion_id FROM skin WHERE champion_id = ?1 ORDER BY number ASC",
            )
            .map_err(CatalogError::query("skin"))?;
        let skins = stmt
            .query_map([champion_id], row_to_skin)
            .map_err(CatalogError::query("skin"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(CatalogError::query("skin"))?;
        Ok(skins)
    }

    async fn skin_numbers(&self, champion_id: &str) -> Result<HashSet<u32>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT number FROM skin WHERE champion_id = ?1")
            .map_err(CatalogError::query("skin"))?;
        let numbers = stmt
            .query_map([champion_id], |row| row.get::<_, u32>(0))
            .map_err(CatalogError::query("skin"))?
            .collect::<Result<HashSet<_>, _>>()
            .map_err(CatalogError::query("skin"))?;
        Ok(numbers)
    }

    async fn upsert_skin(&self, skin: &Skin) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO skin (id, number, name, champion_id)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                number = excluded.number,
                name = excluded.name,
                champion_id = excluded.champion_id
            "#,
            rusqlite::params![skin.id, skin.number, &skin.name, &skin.champion_id],
        )
        .map_err(|e| match constraint_code(&e) {
            Some(UNIQUE_VIOLATION) => CatalogError::DuplicateSkinNumber {
                skin_id: skin.id,
                champion_id: skin.champion_id.clone(),
                number: skin.number,
            },
            Some(FOREIGN_KEY_VIOLATION) => CatalogError::UnknownChampion {
                skin_id: skin.id,
                champion_id: skin.champion_id.clone(),
            },
            _ => CatalogError::query("skin")(e),
        })?;
        Ok(())
    }

    async fn get_skin(&self, id: u32) -> Result<Option<Skin>, CatalogError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, number, name, champion_id FROM skin WHERE id = ?1",
            [id],
            row_to_skin,
        )
        .optional()
        .map_err(CatalogError::query("skin"))
    }

    async fn start_sync_run(&self, version: &str) -> Result<i64, CatalogError> {
        let started_at = Utc::now().timestamp();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sync_runs (version, started_at) VALUES (?1, ?2)",
            rusqlite::params![version, started_at],
        )
        .map_err(CatalogError::query("sync_runs"))?;
        Ok(conn.last_insert_rowid())
    }

    async fn complete_sync_run(
        &self,
        run_id: i64,
        stats: &SyncRunStats,
    ) -> Result<(), CatalogError> {
        let completed_at = Utc::now().timestamp();
        let conn = self.lock()?;
        conn.execute(
            r#"
            UPDATE sync_runs SET
                completed_at = ?1,
                champions_total = ?2,
                champions_failed = ?3,
                skins_synced = ?4,
                skins_failed = ?5,
                images_failed = ?6
            WHERE id = ?7
            "#,
            rusqlite::params![
                completed_at,
                stats.champions_total as i64,
                stats.champions_failed as i64,
                stats.skins_synced as i64,
                stats.skins_failed as i64,
                stats.images_failed as i64,
                run_id,
            ],
        )
        .map_err(CatalogError::query("sync_runs"))?;
        Ok(())
    }

    async fn get_summary(&self) -> Result<CatalogSummary, CatalogError> {
        let conn = self.lock()?;

        let setting = |name: &str| -> Result<Option<String>, CatalogError> {
            conn.query_row("SELECT value FROM setting WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()
            .map_err(CatalogError::query("setting"))
        };
        let version = setting(Setting::Version.as_str())?;
        let synced_version = setting(Setting::SyncedVersion.as_str())?;

        let champions: i64 = conn
            .query_row("SELECT COUNT(*) FROM champion", [], |row| row.get(0))
            .map_err(CatalogError::query("champion"))?;
        let skins: i64 = conn
            .query_row("SELECT COUNT(*) FROM skin", [], |row| row.get(0))
            .map_err(CatalogError::query("skin"))?;

        let (started, completed): (Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT started_at, completed_at FROM sync_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(CatalogError::query("sync_runs"))?
            .unwrap_or((None, None));

        Ok(CatalogSummary {
            version,
            synced_version,
            champions: champions as u64,
            skins: skins as u64,
            last_sync_started: started.and_then(timestamp_to_datetime),
            last_sync_completed: completed.and_then(timestamp_to_datetime),
        })
    }
}

fn row_to_champion(row: &rusqlite::Row<'_>) -> rusqlite::Result<Champion> {
    Ok(Champion {
        id: row.get(0)?,
        name: row.get(1)?,
        title: row.get(2)?,
        lore: row.get(3)?,
    })
}

fn row_to_skin(row: &rusqlite::Row<'_>) -> rusqlite::Result<Skin> {
    Ok(Skin {
        id: row.get(0)?,
        number: row.get(1)?,
        name: row.get(2)?,
        champion_id: row.get(3)?,
    })
}

fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}
