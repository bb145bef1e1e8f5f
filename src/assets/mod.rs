//! Image files addressed by champion/skin identity.
//!
//! No database row tracks an asset: a file at its deterministic path is the
//! only signal that it exists. Writes go to a unique temp file that is
//! fsynced and renamed into place, so a path that exists always holds a
//! complete image and a finished [`AssetStore::write`] means the data is
//! durable.

pub mod error;
pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

pub use error::AssetError;

/// Outcome of a write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetWrite {
    Written,
    AlreadyPresent,
}

static PART_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn loading_screen_path(&self, champion_id: &str) -> PathBuf {
        paths::loading_screen_path(&self.root, champion_id)
    }

    pub fn thumbnail_path(&self, champion_id: &str, number: u32) -> PathBuf {
        paths::thumbnail_path(&self.root, champion_id, number)
    }

    pub fn high_res_path(&self, skin_id: u32) -> PathBuf {
        paths::high_res_path(&self.root, skin_id)
    }

    pub fn high_res_dir(&self) -> PathBuf {
        self.root.join(paths::HIGH_RES_DIR)
    }

    /// Whether a file is present. I/O errors count as absent so the caller
    /// fetches again rather than trusting an unreadable path.
    pub async fn exists(&self, path: &Path) -> bool {
        match fs::try_exists(path).await {
            Ok(present) => present,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot stat asset, assuming missing");
                false
            }
        }
    }

    /// Persist `bytes` at `path`, creating parent directories on demand.
    ///
    /// An existing file is left untouched and reported as
    /// [`AssetWrite::AlreadyPresent`].
    pub async fn write(&self, path: &Path, bytes: &[u8]) -> Result<AssetWrite, AssetError> {
        if self.exists(path).await {
            return Ok(AssetWrite::AlreadyPresent);
        }

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .await
            .map_err(|source| AssetError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;

        let part_path = part_path_for(path);
        if let Err(source) = write_durably(&part_path, bytes).await {
            let _ = fs::remove_file(&part_path).await;
            return Err(AssetError::Write {
                path: path.to_path_buf(),
                source,
            });
        }

        fs::rename(&part_path, path)
            .await
            .map_err(|source| AssetError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), size_bytes = bytes.len(), "Stored asset");
        Ok(AssetWrite::Written)
    }

    /// Total bytes held in `high-res/`. A missing directory is an empty cache.
    pub async fn high_res_usage(&self) -> Result<u64, AssetError> {
        let dir = self.high_res_dir();
        let mut total = 0u64;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => return Err(AssetError::Read { path: dir, source }),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| AssetError::Read {
                path: dir.clone(),
                source,
            })?
        {
            let metadata = entry.metadata().await.map_err(|source| AssetError::Read {
                path: entry.path(),
                source,
            })?;
            if metadata.is_file() {
                total += metadata.len();
            }
        }
        Ok(total)
    }

    /// Delete every `.jpg` in `high-res/`, returning how many were removed.
    pub async fn clear_high_res(&self) -> Result<usize, AssetError> {
        let dir = self.high_res_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => return Err(AssetError::Read { path: dir, source }),
        };
        let mut removed = 0usize;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| AssetError::Read {
                path: dir.clone(),
                source,
            })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jpg") {
                continue;
            }
            fs::remove_file(&path)
                .await
                .map_err(|source| AssetError::Remove {
                    path: path.clone(),
                    source,
                })?;
            removed += 1;
        }
        Ok(removed)
    }
}

/// Sibling temp path, unique per write so concurrent writers never share one.
fn part_path_for(path: &Path) -> PathBuf {
    let n = PART_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("asset");
    path.with_file_name(format!(".{name}.{}-{n}.part", std::process::id()))
}

async fn write_durably(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}
