//! Catalog synchronization: version check, diff, fan-out, fan-in.
//!
//! One task per champion, and inside it one task per missing skin. Every
//! request goes through the shared rate limiter held by the
//! [`CatalogSource`], so the nesting never raises the number of requests
//! in flight. A failing task is logged and counted; it leaves its champion
//! or skin absent for the next run and never aborts its siblings.

pub mod error;

use std::sync::Arc;

use futures_util::future::join_all;

use crate::assets::{AssetStore, AssetWrite};
use crate::catalog::{CatalogStore, Champion, Setting, Skin, SyncRunStats};
use crate::ddragon::{CatalogSource, ChampionDetail, ChampionSummary, SkinSummary};
use crate::progress::{ProgressTracker, UpdateState};

pub use error::SyncError;

/// Raw skin name Data Dragon uses for a champion's base skin.
const DEFAULT_SKIN_NAME: &str = "default";

/// Display name stored for a skin.
pub fn normalize_skin_name(raw: &str, champion_name: &str) -> String {
    if raw == DEFAULT_SKIN_NAME {
        format!("Original {champion_name}")
    } else {
        raw.to_string()
    }
}

/// Result of one champion task.
#[derive(Debug, Clone)]
pub struct ChampionOutcome {
    pub champion: Champion,
    pub skins_synced: u64,
    pub skins_failed: u64,
    pub images_failed: u64,
}

#[derive(Debug, Clone, Copy)]
struct SkinOutcome {
    image_failed: bool,
}

/// Drives a sync against a remote source, a catalog store and the asset
/// tree, publishing progress as champions finish.
pub struct Updater {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn CatalogStore>,
    assets: AssetStore,
    progress: ProgressTracker,
}

impl Updater {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        store: Arc<dyn CatalogStore>,
        assets: AssetStore,
        progress: ProgressTracker,
    ) -> Self {
        Self {
            source,
            store,
            assets,
            progress,
        }
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Compare the stored version with the remote one and sync on mismatch.
    ///
    /// Never fails: errors are logged and the final state is returned either
    /// way. A version whose last sync did not complete is synced again even
    /// when it matches the stored one.
    pub async fn check_for_update(&self) -> UpdateState {
        if let Err(e) = self.run_check().await {
            tracing::error!(error = %e, "Update check failed");
        }
        self.progress.set_updating(false);
        self.progress.snapshot()
    }

    async fn run_check(&self) -> Result<(), SyncError> {
        let stored = match self.store.get_setting(Setting::Version).await {
            Ok(stored) => stored,
            Err(e) => {
                self.progress.set_checked(false);
                return Err(e.into());
            }
        };
        let remote = match self.source.latest_version().await {
            Ok(remote) => remote,
            Err(e) => {
                self.progress.set_checked(false);
                return Err(e.into());
            }
        };

        self.progress.reset();
        self.progress.set_checked(true);

        let synced = self.store.get_setting(Setting::SyncedVersion).await?;
        let version_changed = stored.as_deref() != Some(remote.as_str());
        let interrupted = synced.as_deref() != Some(remote.as_str());
        if !version_changed && !interrupted {
            tracing::info!(version = %remote, "Catalog is up to date");
            return Ok(());
        }

        if version_changed {
            tracing::info!(
                stored = stored.as_deref().unwrap_or("none"),
                remote = %remote,
                "New game version detected"
            );
        } else {
            tracing::info!(version = %remote, "Previous sync did not complete, resuming");
        }

        self.progress.set_updating(true);
        self.store.set_setting(Setting::Version, &remote).await?;
        self.sync_catalog(&remote).await?;
        Ok(())
    }

    /// Fetch the champion index for `version` and sync every champion.
    ///
    /// Task failures are folded into the returned counters. `synced_version`
    /// is written only when every champion and skin row was stored.
    pub async fn sync_catalog(&self, version: &str) -> Result<SyncRunStats, SyncError> {
        let run_id = self.store.start_sync_run(version).await?;
        let champions = self.source.champion_index(version).await?;
        let total = champions.len() as u64;
        self.progress.set_total(total);
        tracing::info!(version, champions = total, "Syncing catalog");

        let outcomes = join_all(
            champions
                .iter()
                .map(|summary| self.sync_champion_tracked(version, summary)),
        )
        .await;

        let mut stats = SyncRunStats {
            champions_total: total,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Some(o) => {
                    if o.skins_synced > 0 {
                        tracing::debug!(
                            champion = %o.champion.name,
                            skins = o.skins_synced,
                            "New skins stored"
                        );
                    }
                    stats.skins_synced += o.skins_synced;
                    stats.skins_failed += o.skins_failed;
                    stats.images_failed += o.images_failed;
                }
                None => stats.champions_failed += 1,
            }
        }

        self.store.complete_sync_run(run_id, &stats).await?;
        if stats.is_complete() {
            self.store.set_setting(Setting::SyncedVersion, version).await?;
        }

        tracing::info!(
            version,
            champions = stats.champions_total,
            champions_failed = stats.champions_failed,
            skins_synced = stats.skins_synced,
            skins_failed = stats.skins_failed,
            images_failed = stats.images_failed,
            "Catalog sync finished"
        );
        Ok(stats)
    }

    /// Run one champion task and count it, whatever its result.
    async fn sync_champion_tracked(
        &self,
        version: &str,
        summary: &ChampionSummary,
    ) -> Option<ChampionOutcome> {
        let result = self.sync_champion(version, summary).await;
        let state = self.progress.increment();
        tracing::debug!(
            champion = %summary.id,
            current = state.current_iterations,
            total = state.total_iterations,
            "Champion finished"
        );
        match result {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(champion = %summary.id, error = %e, "Champion sync failed");
                None
            }
        }
    }

    /// Sync one champion and its missing skins.
    pub async fn sync_champion(
        &self,
        version: &str,
        summary: &ChampionSummary,
    ) -> Result<ChampionOutcome, SyncError> {
        let detail = self.source.champion_detail(version, &summary.id).await?;
        let champion = Champion {
            id: detail.id.clone(),
            name: detail.name.clone(),
            title: detail.title.clone(),
            lore: detail.lore.clone(),
        };

        let mut images_failed = 0;
        if !self.store.champion_exists(&champion.id).await? {
            self.store.create_champion(&champion).await?;
            tracing::debug!(champion = %champion.id, "Created champion");
            if let Err(e) = self.store_loading_image(&champion.id).await {
                tracing::warn!(champion = %champion.id, error = %e, "Loading screen image not stored");
                images_failed += 1;
            }
        }

        let stored = self.store.skin_numbers(&champion.id).await?;
        let missing: Vec<&SkinSummary> = detail
            .skins
            .iter()
            .filter(|skin| !stored.contains(&skin.num))
            .collect();

        let results = join_all(missing.iter().map(|skin| self.sync_skin(&detail, skin))).await;

        let mut skins_synced = 0;
        let mut skins_failed = 0;
        for (skin, result) in missing.iter().zip(results) {
            match result {
                Ok(outcome) => {
                    skins_synced += 1;
                    if outcome.image_failed {
                        images_failed += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        champion = %champion.id,
                        skin_id = skin.id,
                        number = skin.num,
                        error = %e,
                        "Skin sync failed"
                    );
                    skins_failed += 1;
                }
            }
        }

        Ok(ChampionOutcome {
            champion,
            skins_synced,
            skins_failed,
            images_failed,
        })
    }

    /// Upsert one skin row, then fetch its splash art. A missing image
    /// leaves the row in place.
    async fn sync_skin(
        &self,
        champion: &ChampionDetail,
        summary: &SkinSummary,
    ) -> Result<SkinOutcome, SyncError> {
        let skin = Skin {
            id: summary.id,
            number: summary.num,
            name: normalize_skin_name(&summary.name, &champion.name),
            champion_id: champion.id.clone(),
        };
        self.store.upsert_skin(&skin).await?;

        let image_failed = match self.store_thumbnail(&champion.id, skin.number).await {
            Ok(_) => false,
            Err(e) => {
                tracing::warn!(
                    champion = %champion.id,
                    number = skin.number,
                    error = %e,
                    "Thumbnail not stored"
                );
                true
            }
        };
        Ok(SkinOutcome { image_failed })
    }

    async fn store_loading_image(&self, champion_id: &str) -> Result<AssetWrite, SyncError> {
        let path = self.assets.loading_screen_path(champion_id);
        if self.assets.exists(&path).await {
            return Ok(AssetWrite::AlreadyPresent);
        }
        let bytes = self.source.loading_image(champion_id).await?;
        Ok(self.assets.write(&path, &bytes).await?)
    }

    async fn store_thumbnail(
        &self,
        champion_id: &str,
        number: u32,
    ) -> Result<AssetWrite, SyncError> {
        let path = self.assets.thumbnail_path(champion_id, number);
        if self.assets.exists(&path).await {
            return Ok(AssetWrite::AlreadyPresent);
        }
        let bytes = self.source.splash_image(champion_id, number).await?;
        Ok(self.assets.write(&path, &bytes).await?)
    }
}
