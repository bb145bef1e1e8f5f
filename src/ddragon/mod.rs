//! Remote champion catalog (Riot's Data Dragon CDN).

pub mod endpoints;
pub mod types;

use async_trait::async_trait;

use crate::fetch::{FetchError, Fetcher};

pub use endpoints::Endpoints;
pub use types::{ChampionDetail, ChampionSummary, SkinSummary};

use types::{ChampionDetailEnvelope, ChampionIndex};

/// Everything the sync pipeline reads from the remote side.
///
/// Object-safe so the updater can hold an `Arc<dyn CatalogSource>` and tests
/// can substitute an in-memory catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Current game version (first entry of the published version list).
    async fn latest_version(&self) -> Result<String, FetchError>;

    async fn champion_index(&self, version: &str) -> Result<Vec<ChampionSummary>, FetchError>;

    async fn champion_detail(
        &self,
        version: &str,
        champion_id: &str,
    ) -> Result<ChampionDetail, FetchError>;

    async fn loading_image(&self, champion_id: &str) -> Result<Vec<u8>, FetchError>;

    async fn splash_image(&self, champion_id: &str, number: u32) -> Result<Vec<u8>, FetchError>;
}

/// [`CatalogSource`] backed by HTTP through the shared rate-limited fetcher.
#[derive(Debug, Clone)]
pub struct DataDragon {
    fetcher: Fetcher,
    endpoints: Endpoints,
}

impl DataDragon {
    pub fn new(fetcher: Fetcher, endpoints: Endpoints) -> Self {
        Self { fetcher, endpoints }
    }
}

#[async_trait]
impl CatalogSource for DataDragon {
    async fn latest_version(&self) -> Result<String, FetchError> {
        let url = self.endpoints.versions();
        let versions: Vec<String> = self.fetcher.get_json(&url).await?;
        versions.into_iter().next().ok_or(FetchError::Payload {
            url,
            reason: "empty version list".to_string(),
        })
    }

    async fn champion_index(&self, version: &str) -> Result<Vec<ChampionSummary>, FetchError> {
        let url = self.endpoints.champion_index(version);
        let index: ChampionIndex = self.fetcher.get_json(&url).await?;
        Ok(index.data.into_values().collect())
    }

    async fn champion_detail(
        &self,
        version: &str,
        champion_id: &str,
    ) -> Result<ChampionDetail, FetchError> {
        let url = self.endpoints.champion_detail(version, champion_id);
        let mut envelope: ChampionDetailEnvelope = self.fetcher.get_json(&url).await?;
        envelope
            .data
            .remove(champion_id)
            .ok_or_else(|| FetchError::Payload {
                url,
                reason: format!("no entry for champion {champion_id}"),
            })
    }

    async fn loading_image(&self, champion_id: &str) -> Result<Vec<u8>, FetchError> {
        self.fetcher
            .get_bytes(&self.endpoints.loading_image(champion_id))
            .await
    }

    async fn splash_image(&self, champion_id: &str, number: u32) -> Result<Vec<u8>, FetchError> {
        self.fetcher
            .get_bytes(&self.endpoints.splash_image(champion_id, number))
            .await
    }
}
