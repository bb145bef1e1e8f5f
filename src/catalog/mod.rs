//! Persistent champion catalog.
//!
//! SQLite holds three kinds of rows: settings (the synced game version),
//! champions and their skins. A small ledger of sync runs backs the `info`
//! command. The store is a key-addressed upsert/lookup layer; it knows
//! nothing about the remote catalog.

pub mod db;
pub mod error;
pub mod schema;
pub mod types;

pub use db::{CatalogStore, SqliteCatalogStore};
pub use error::CatalogError;
pub use types::{Champion, Setting, Skin, SyncRunStats};
