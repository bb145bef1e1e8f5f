use thiserror::Error;

use crate::assets::AssetError;
use crate::catalog::CatalogError;
use crate::fetch::FetchError;

/// Failure of one step of the sync pipeline.
///
/// Inside a fan-out these are logged and counted against the task that
/// raised them; they never reach sibling tasks.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}
