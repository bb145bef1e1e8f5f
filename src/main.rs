//! league-displays: League of Legends champion art on the desktop.
//!
//! Mirrors the champion and skin catalog from Riot's Data Dragon into a
//! local SQLite database and image tree, keeping it current as new game
//! versions ship. Any skin's full-size splash art can then be fetched from
//! the community wiki and set as the desktop background.

#![warn(clippy::all)]

mod assets;
mod catalog;
mod cli;
mod config;
mod ddragon;
mod fetch;
mod progress;
pub mod retry;
mod shutdown;
mod sync;
mod types;
mod wallpaper;

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use assets::AssetStore;
use catalog::{CatalogStore, SqliteCatalogStore};
use cli::Command;
use config::Config;
use ddragon::DataDragon;
use fetch::Fetcher;
use progress::{ProgressTracker, UpdateState};
use sync::Updater;
use wallpaper::{FandomScraper, ResolveOutcome, Resolver, SystemBackground};

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Open the catalog for a read-only command, or explain why there is none.
async fn open_existing_catalog(db_path: &Path) -> anyhow::Result<Option<SqliteCatalogStore>> {
    if !db_path.exists() {
        println!("No catalog database found at {}", db_path.display());
        println!("Run `league-displays sync` first to create it.");
        return Ok(None);
    }
    Ok(Some(SqliteCatalogStore::open(db_path).await?))
}

/// Create a progress bar with a consistent template.
///
/// Hidden when the user passed `--no-progress-bar` or stdout is not a TTY.
fn create_progress_bar(no_progress_bar: bool) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} champions ({eta})",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

/// One update check with the progress bar following the tracker.
///
/// Returns `None` if shutdown was requested before the check finished.
async fn run_check(
    updater: &Updater,
    shutdown_token: &CancellationToken,
    no_progress_bar: bool,
) -> Option<UpdateState> {
    let pb = create_progress_bar(no_progress_bar);
    let mut progress = updater.progress().subscribe();
    let check = updater.check_for_update();
    tokio::pin!(check);

    let state = loop {
        tokio::select! {
            state = &mut check => break Some(state),
            Ok(()) = progress.changed() => {
                let state = *progress.borrow_and_update();
                pb.set_length(state.total_iterations);
                pb.set_position(state.current_iterations);
            }
            _ = shutdown_token.cancelled() => break None,
        }
    };
    pb.finish_and_clear();
    state
}

/// Run the sync command, once or on an interval.
async fn run_sync(config: Config) -> anyhow::Result<()> {
    let fetcher = Fetcher::new(&config.fetch_config())?;
    let source = Arc::new(DataDragon::new(fetcher, config.endpoints()));
    let db_path = config.db_path();
    let store = Arc::new(SqliteCatalogStore::open(&db_path).await?);
    tracing::debug!("Catalog database opened at {}", db_path.display());
    let assets = AssetStore::new(config.image_directory());

    let updater = Updater::new(source, store.clone(), assets, ProgressTracker::new());
    let shutdown_token = shutdown::stop_token()?;

    tracing::info!(
        concurrency = config.max_concurrent_requests,
        images = %config.image_directory().display(),
        "Starting league-displays sync"
    );

    loop {
        let Some(state) = run_check(&updater, &shutdown_token, config.no_progress_bar).await
        else {
            tracing::info!("Shutdown requested, exiting...");
            break;
        };

        match store.get_summary().await {
            Ok(summary) => tracing::info!(
                version = summary.version.as_deref().unwrap_or("none"),
                champions = summary.champions,
                skins = summary.skins,
                synced = summary.synced_version == summary.version,
                "Catalog state"
            ),
            Err(e) => tracing::warn!(error = %e, "Cannot read catalog summary"),
        }
        if !state.checked_for_update {
            tracing::warn!("Could not reach Data Dragon; will try again on the next check");
        }

        if let Some(interval) = config.watch_with_interval {
            tracing::info!("Waiting {} seconds...", interval);
            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_secs(interval)) => {}
                _ = shutdown_token.cancelled() => {
                    tracing::info!("Shutdown during wait, exiting...");
                    break;
                }
            }
        } else {
            break;
        }
    }

    Ok(())
}

/// Run the info command.
async fn run_info(config: Config) -> anyhow::Result<()> {
    let db_path = config.db_path();
    let Some(store) = open_existing_catalog(&db_path).await? else {
        return Ok(());
    };
    let summary = store.get_summary().await?;

    println!("Catalog Database: {}", db_path.display());
    println!("Images:           {}", config.image_directory().display());
    println!();
    println!(
        "Game version: {}",
        summary.version.as_deref().unwrap_or("unknown")
    );
    if summary.version.is_some() && summary.synced_version != summary.version {
        println!("  (last sync of this version did not complete)");
    }
    println!("Champions:    {}", summary.champions);
    println!("Skins:        {}", summary.skins);
    println!();

    if let Some(started) = &summary.last_sync_started {
        println!(
            "Last sync started:   {}",
            started.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if let Some(completed) = &summary.last_sync_completed {
        println!(
            "Last sync completed: {}",
            completed.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}

/// Run the champions command.
async fn run_champions(config: Config) -> anyhow::Result<()> {
    let Some(store) = open_existing_catalog(&config.db_path()).await? else {
        return Ok(());
    };
    let assets = AssetStore::new(config.image_directory());

    let champions = store.list_champions().await?;
    for champion in &champions {
        println!(
            "{:<16} {:<28} {}",
            champion.id,
            champion.name,
            assets.loading_screen_path(&champion.id).display()
        );
    }
    println!();
    println!("{} champions", champions.len());
    Ok(())
}

/// Run the champion command.
async fn run_champion(config: Config, id: &str) -> anyhow::Result<()> {
    let Some(store) = open_existing_catalog(&config.db_path()).await? else {
        return Ok(());
    };
    let assets = AssetStore::new(config.image_directory());

    let Some(champion) = store.get_champion(id).await? else {
        anyhow::bail!("Champion '{}' is not in the catalog", id);
    };
    println!("{}, {}", champion.name, champion.title);
    println!();
    println!("{}", champion.lore);
    println!();
    println!("Skins:");
    for skin in store.skins_for_champion(&champion.id).await? {
        let high_res = if assets.high_res_path(skin.id).exists() {
            " [high-res cached]"
        } else {
            ""
        };
        println!(
            "  {:>3}  {:<8} {}{}  {}",
            skin.number,
            skin.id,
            skin.name,
            high_res,
            assets.thumbnail_path(&champion.id, skin.number).display()
        );
    }
    Ok(())
}

/// Run the wallpaper command.
async fn run_wallpaper(config: Config, skin_id: u32) -> anyhow::Result<()> {
    let Some(store) = open_existing_catalog(&config.db_path()).await? else {
        return Ok(());
    };
    let fetcher = Arc::new(Fetcher::new(&config.fetch_config())?);
    let resolver = Resolver::new(
        Arc::new(store),
        AssetStore::new(config.image_directory()),
        Arc::new(FandomScraper::new(fetcher.clone())),
        fetcher,
        Arc::new(SystemBackground),
    )
    .with_wiki_base(config.wiki_url.clone());
    let mut events = resolver.subscribe();

    let outcome = resolver.resolve_high_res(skin_id).await?;
    if let Ok(event) = events.try_recv() {
        tracing::info!(skin_id = event.skin_id, outcome = %event.outcome, "Wallpaper resolution finished");
    }
    match outcome {
        ResolveOutcome::AlreadyCached | ResolveOutcome::Success => {
            println!("Wallpaper set to skin {}", skin_id);
            Ok(())
        }
        ResolveOutcome::Fail => {
            anyhow::bail!("No high-res image could be found for skin {}", skin_id)
        }
        ResolveOutcome::Timeout => {
            anyhow::bail!("Timed out looking up the high-res image for skin {}", skin_id)
        }
        ResolveOutcome::Superseded => Ok(()),
    }
}

/// Run the cache-size command.
async fn run_cache_size(config: Config) -> anyhow::Result<()> {
    let assets = AssetStore::new(config.image_directory());
    let bytes = assets.high_res_usage().await?;
    println!("{:.2} MB", bytes as f64 / BYTES_PER_MB);
    Ok(())
}

/// Run the clear-cache command.
async fn run_clear_cache(config: Config, yes: bool) -> anyhow::Result<()> {
    let assets = AssetStore::new(config.image_directory());

    if !yes {
        println!("This will delete every cached high-res image in:");
        println!("  {}", assets.high_res_dir().display());
        println!();
        print!("Are you sure? [y/N] ");
        use std::io::Write;
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let removed = assets.clear_high_res().await?;
    println!("Removed {} cached images.", removed);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.global.log_level.as_filter())),
        )
        .init();

    let sync_args = match &cli.command {
        Command::Sync(args) => Some(args.clone()),
        _ => None,
    };
    let config = Config::from_cli(cli.global, sync_args)?;

    match cli.command {
        Command::Sync(_) => run_sync(config).await,
        Command::Info => run_info(config).await,
        Command::Champions => run_champions(config).await,
        Command::Champion { id } => run_champion(config, &id).await,
        Command::Wallpaper { skin_id } => run_wallpaper(config, skin_id).await,
        Command::CacheSize => run_cache_size(config).await,
        Command::ClearCache { yes } => run_clear_cache(config, yes).await,
    }
}
