use clap::{Args, Parser, Subcommand};

use crate::ddragon::endpoints::{DEFAULT_BASE_URL, DEFAULT_LOCALE};
use crate::types::LogLevel;
use crate::wallpaper::DEFAULT_WIKI_BASE_URL;

#[derive(Parser, Debug)]
#[command(
    name = "league-displays",
    version,
    about = "Sync League of Legends champion art and use skin splash arts as wallpaper"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding the catalog database and images
    #[arg(
        long,
        global = true,
        env = "LEAGUE_DISPLAYS_DIR",
        default_value = "~/.league-displays"
    )]
    pub data_directory: String,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Maximum number of HTTP requests in flight at once
    #[arg(long, global = true, default_value_t = 10)]
    pub max_concurrent_requests: usize,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub request_timeout: u64,

    /// Retries for transient HTTP failures (429, 5xx, connection errors)
    #[arg(long, global = true, default_value_t = 2)]
    pub max_retries: u32,

    /// Initial retry delay in seconds (doubles each attempt)
    #[arg(long, global = true, default_value_t = 1)]
    pub retry_delay: u64,

    /// Data Dragon base URL
    #[arg(long, global = true, env = "LEAGUE_DISPLAYS_DDRAGON_URL", default_value = DEFAULT_BASE_URL)]
    pub ddragon_url: String,

    /// Locale of champion names and lore
    #[arg(long, global = true, default_value = DEFAULT_LOCALE)]
    pub locale: String,

    /// Wiki base URL used to find high-res splash arts
    #[arg(long, global = true, default_value = DEFAULT_WIKI_BASE_URL)]
    pub wiki_url: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check for a new game version and sync champions, skins and images
    Sync(SyncArgs),

    /// Show the stored version, counts and last sync run
    Info,

    /// List stored champions
    Champions,

    /// Show one champion and its skins
    Champion {
        /// Champion id, e.g. "MissFortune"
        id: String,
    },

    /// Set a skin's high-res splash art as the desktop background
    Wallpaper {
        /// Skin id, e.g. 266001
        skin_id: u32,
    },

    /// Show the size of the high-res image cache
    CacheSize,

    /// Delete all cached high-res images
    ClearCache {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Keep running, checking for a new version every N seconds
    #[arg(long)]
    pub watch_with_interval: Option<u64>,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_defaults() {
        let cli = Cli::try_parse_from(["league-displays", "sync"]).unwrap();
        assert!(matches!(cli.command, Command::Sync(ref args) if args.watch_with_interval.is_none()));
        assert_eq!(cli.global.max_concurrent_requests, 10);
        assert_eq!(cli.global.locale, "en_US");
        assert_eq!(cli.global.log_level, LogLevel::Info);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "league-displays",
            "sync",
            "--watch-with-interval",
            "3600",
            "--max-concurrent-requests",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.global.max_concurrent_requests, 4);
        match cli.command {
            Command::Sync(args) => assert_eq!(args.watch_with_interval, Some(3600)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_wallpaper_takes_numeric_skin_id() {
        let cli = Cli::try_parse_from(["league-displays", "wallpaper", "266001"]).unwrap();
        assert!(matches!(cli.command, Command::Wallpaper { skin_id: 266001 }));
        assert!(Cli::try_parse_from(["league-displays", "wallpaper", "justicar"]).is_err());
    }

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["league-displays"]).is_err());
    }
}
