//! On-demand high-resolution wallpapers.
//!
//! A skin's full-size artwork is not on Data Dragon; it is located by
//! scraping the community wiki, downloaded, re-encoded as JPEG and cached
//! under `high-res/`. A cached file is applied straight away with no
//! network traffic.

pub mod desktop;
pub mod error;
pub mod scrape;
pub mod transcode;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::assets::AssetStore;
use crate::catalog::CatalogStore;
use crate::fetch::ByteSource;

pub use desktop::{DesktopBackground, SystemBackground};
pub use error::{AcquireError, ResolveError};
pub use scrape::{FandomScraper, PageScraper, ResolutionSlot, ScrapeReply};

pub const DEFAULT_WIKI_BASE_URL: &str = "https://leagueoflegends.fandom.com";

/// How long the scraper gets before the resolution counts as timed out.
pub const SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The file was cached and has been applied.
    AlreadyCached,
    /// Downloaded, stored and applied.
    Success,
    /// The wiki has no usable image, or it could not be fetched or decoded.
    Fail,
    /// The scraper gave no answer in time.
    Timeout,
    /// A newer resolution took over before this one got its answer.
    Superseded,
}

impl ResolveOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyCached => "already-cached",
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Timeout => "timeout",
            Self::Superseded => "superseded",
        }
    }
}

impl std::fmt::Display for ResolveOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broadcast once per finished resolution (superseded ones excepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallpaperEvent {
    pub skin_id: u32,
    pub outcome: ResolveOutcome,
}

/// Wiki page whose file viewer shows the skin's HD splash.
///
/// Mirrors the wiki's file naming: the skin name loses its first mention of
/// the champion, its first `/` (K/DA) and first `:`, then all whitespace.
pub fn wiki_lookup_url(base: &str, champion_name: &str, skin_name: &str) -> String {
    let skin = skin_name
        .replacen(champion_name, "", 1)
        .replacen('/', "", 1)
        .replacen(':', "", 1);
    let skin: String = skin.chars().filter(|c| !c.is_whitespace()).collect();
    format!(
        "{}/wiki/{champion_name}/LoL/Cosmetics?file={champion_name}_{skin}Skin_HD.jpg",
        base.trim_end_matches('/')
    )
}

pub struct Resolver {
    store: Arc<dyn CatalogStore>,
    assets: AssetStore,
    scraper: Arc<dyn PageScraper>,
    downloader: Arc<dyn ByteSource>,
    background: Arc<dyn DesktopBackground>,
    slot: ResolutionSlot,
    events: broadcast::Sender<WallpaperEvent>,
    wiki_base: String,
    scrape_timeout: Duration,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        assets: AssetStore,
        scraper: Arc<dyn PageScraper>,
        downloader: Arc<dyn ByteSource>,
        background: Arc<dyn DesktopBackground>,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            store,
            assets,
            scraper,
            downloader,
            background,
            slot: ResolutionSlot::new(),
            events,
            wiki_base: DEFAULT_WIKI_BASE_URL.to_string(),
            scrape_timeout: SCRAPE_TIMEOUT,
        }
    }

    pub fn with_wiki_base(mut self, wiki_base: impl Into<String>) -> Self {
        self.wiki_base = wiki_base.into();
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WallpaperEvent> {
        self.events.subscribe()
    }

    /// Make `skin_id`'s high-res artwork the desktop background, fetching it
    /// first if it is not cached.
    pub async fn resolve_high_res(&self, skin_id: u32) -> Result<ResolveOutcome, ResolveError> {
        let path = self.assets.high_res_path(skin_id);
        if self.assets.exists(&path).await {
            tracing::debug!(skin_id, "High-res image cached");
            self.background.apply(&path).await?;
            self.emit(skin_id, ResolveOutcome::AlreadyCached);
            return Ok(ResolveOutcome::AlreadyCached);
        }

        let skin = self
            .store
            .get_skin(skin_id)
            .await?
            .ok_or(ResolveError::UnknownSkin(skin_id))?;
        let champion = self
            .store
            .get_champion(&skin.champion_id)
            .await?
            .ok_or_else(|| ResolveError::UnknownChampion {
                skin_id,
                champion_id: skin.champion_id.clone(),
            })?;
        let page_url = wiki_lookup_url(&self.wiki_base, &champion.name, &skin.name);

        let registration = self.slot.register();
        tracing::info!(
            skin_id,
            generation = registration.generation(),
            url = %page_url,
            "Resolving high-res image"
        );
        let reply = tokio::select! {
            _ = registration.superseded() => None,
            reply = tokio::time::timeout(
                self.scrape_timeout,
                self.scraper.resolve(&page_url),
            ) => Some(reply),
        };
        let still_current = self.slot.is_current(&registration);
        self.slot.release(&registration);
        let reply = match reply {
            Some(reply) if still_current => reply,
            _ => {
                tracing::debug!(skin_id, "Resolution superseded");
                return Ok(ResolveOutcome::Superseded);
            }
        };

        let outcome = match reply {
            Err(_) => {
                tracing::warn!(
                    skin_id,
                    timeout_secs = self.scrape_timeout.as_secs(),
                    "Wiki lookup timed out"
                );
                ResolveOutcome::Timeout
            }
            Ok(ScrapeReply::Fail) => {
                tracing::warn!(skin_id, "Wiki has no high-res image");
                ResolveOutcome::Fail
            }
            Ok(ScrapeReply::Url(image_url)) => match self.acquire(&image_url, &path).await {
                Ok(()) => {
                    self.background.apply(&path).await?;
                    ResolveOutcome::Success
                }
                Err(e) => {
                    tracing::warn!(skin_id, url = %image_url, error = %e, "High-res image not stored");
                    ResolveOutcome::Fail
                }
            },
        };

        self.emit(skin_id, outcome);
        Ok(outcome)
    }

    /// Download, transcode and durably store one image.
    async fn acquire(&self, image_url: &str, path: &Path) -> Result<(), AcquireError> {
        let bytes = self.downloader.download(image_url).await?;
        let jpeg = transcode::to_jpeg(bytes).await?;
        self.assets.write(path, &jpeg).await?;
        Ok(())
    }

    fn emit(&self, skin_id: u32, outcome: ResolveOutcome) {
        // No subscribers is fine.
        let _ = self.events.send(WallpaperEvent { skin_id, outcome });
    }
}
