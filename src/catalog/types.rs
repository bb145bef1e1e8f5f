//! Rows of the catalog store.

use chrono::{DateTime, Utc};

/// Keys of the `setting` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    /// Last remote version detected; written before that version's assets
    /// are fetched.
    Version,
    /// Last version whose sync finished without champion or skin failures.
    SyncedVersion,
}

impl Setting {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::SyncedVersion => "synced_version",
        }
    }
}

/// Top-level catalog entry. Created once, never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Champion {
    pub id: String,
    pub name: String,
    pub title: String,
    pub lore: String,
}

/// A skin row; `number` is unique within `champion_id`, `id` globally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skin {
    pub id: u32,
    pub number: u32,
    pub name: String,
    pub champion_id: String,
}

/// Counters for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRunStats {
    pub champions_total: u64,
    /// Champion tasks that ended in an error (detail fetch, row insert).
    pub champions_failed: u64,
    pub skins_synced: u64,
    pub skins_failed: u64,
    /// Images that could not be fetched or stored; their rows were kept.
    pub images_failed: u64,
}

impl SyncRunStats {
    /// True when every champion and skin row made it into the store.
    pub fn is_complete(&self) -> bool {
        self.champions_failed == 0 && self.skins_failed == 0
    }
}

/// Overview shown by the `info` command.
#[derive(Debug, Clone, Default)]
pub struct CatalogSummary {
    pub version: Option<String>,
    pub synced_version: Option<String>,
    pub champions: u64,
    pub skins: u64,
    pub last_sync_started: Option<DateTime<Utc>>,
    pub last_sync_completed: Option<DateTime<Utc>>,
}
