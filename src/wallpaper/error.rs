use std::path::PathBuf;

use thiserror::Error;

use crate::assets::AssetError;
use crate::catalog::CatalogError;
use crate::fetch::FetchError;

/// Failure to hand an image to the desktop environment.
#[derive(Debug, Error)]
pub enum WallpaperError {
    #[error("Setting the desktop background is not supported on {0}")]
    Unsupported(&'static str),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}

/// Errors that stop a resolution before an outcome exists.
///
/// A missing or unreachable high-res image is not one of these; it is the
/// `Fail` or `Timeout` outcome.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Unknown skin {0}")]
    UnknownSkin(u32),

    #[error("Skin {skin_id} belongs to unknown champion {champion_id}")]
    UnknownChampion { skin_id: u32, champion_id: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Background(#[from] WallpaperError),
}

/// Failure between a found image URL and a stored high-res file.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    Download(#[from] FetchError),

    #[error("Failed to decode image: {0}")]
    Decode(image::ImageError),

    #[error("Failed to encode JPEG: {0}")]
    Encode(image::ImageError),

    #[error("Transcode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Store(#[from] AssetError),
}
