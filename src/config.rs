use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{GlobalArgs, SyncArgs};
use crate::ddragon::Endpoints;
use crate::fetch::FetchConfig;
use crate::retry::RetryConfig;
use crate::types::LogLevel;

const DATABASE_FILE: &str = "catalog.db";
const IMAGE_DIR: &str = "images";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_directory: PathBuf,
    pub ddragon_url: String,
    pub locale: String,
    pub wiki_url: String,

    pub watch_with_interval: Option<u64>,
    pub request_timeout_secs: u64,
    pub retry_delay_secs: u64,
    pub max_concurrent_requests: usize,
    pub max_retries: u32,

    #[allow(dead_code)] // Read from cli.global.log_level before the config is built
    pub log_level: LogLevel,

    pub no_progress_bar: bool,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(global: GlobalArgs, sync: Option<SyncArgs>) -> anyhow::Result<Self> {
        let sync = sync.unwrap_or_default();

        if global.max_concurrent_requests == 0 {
            anyhow::bail!("--max-concurrent-requests must be at least 1");
        }
        if global.request_timeout == 0 {
            anyhow::bail!("--request-timeout must be at least 1 second");
        }
        if sync.watch_with_interval == Some(0) {
            anyhow::bail!("--watch-with-interval must be at least 1 second");
        }
        for (flag, url) in [
            ("--ddragon-url", &global.ddragon_url),
            ("--wiki-url", &global.wiki_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{flag} must be an http(s) URL, got '{url}'");
            }
        }

        Ok(Self {
            data_directory: expand_tilde(&global.data_directory),
            ddragon_url: global.ddragon_url,
            locale: global.locale,
            wiki_url: global.wiki_url,
            watch_with_interval: sync.watch_with_interval,
            request_timeout_secs: global.request_timeout,
            retry_delay_secs: global.retry_delay,
            max_concurrent_requests: global.max_concurrent_requests,
            max_retries: global.max_retries,
            log_level: global.log_level,
            no_progress_bar: sync.no_progress_bar,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_directory.join(DATABASE_FILE)
    }

    pub fn image_directory(&self) -> PathBuf {
        self.data_directory.join(IMAGE_DIR)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.ddragon_url, &self.locale)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            retry: RetryConfig {
                max_retries: self.max_retries,
                base_delay: Duration::from_secs(self.retry_delay_secs),
                max_delay: Duration::from_secs(30),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    fn parse(args: &[&str]) -> (GlobalArgs, Option<SyncArgs>) {
        let mut argv = vec!["league-displays"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let sync = match cli.command {
            Command::Sync(sync) => Some(sync),
            _ => None,
        };
        (cli.global, sync)
    }

    #[test]
    fn test_expand_tilde_with_home() {
        let result = expand_tilde("~/.league-displays");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home.join(".league-displays"));
        }
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(
            expand_tilde("/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(
            expand_tilde("relative/path"),
            PathBuf::from("relative/path")
        );
    }

    #[test]
    fn test_paths_live_under_data_directory() {
        let (global, sync) = parse(&["--data-directory", "/srv/ld", "info"]);
        let cfg = Config::from_cli(global, sync).unwrap();
        assert_eq!(cfg.db_path(), PathBuf::from("/srv/ld/catalog.db"));
        assert_eq!(cfg.image_directory(), PathBuf::from("/srv/ld/images"));
    }

    #[test]
    fn test_fetch_config_passthrough() {
        let (global, sync) = parse(&[
            "sync",
            "--max-concurrent-requests",
            "3",
            "--request-timeout",
            "5",
            "--max-retries",
            "0",
        ]);
        let fetch = Config::from_cli(global, sync).unwrap().fetch_config();
        assert_eq!(fetch.max_concurrent_requests, 3);
        assert_eq!(fetch.request_timeout, Duration::from_secs(5));
        assert_eq!(fetch.retry.max_retries, 0);
    }

    #[test]
    fn test_sync_flags_passthrough() {
        let (global, sync) = parse(&["sync", "--watch-with-interval", "600", "--no-progress-bar"]);
        let cfg = Config::from_cli(global, sync).unwrap();
        assert_eq!(cfg.watch_with_interval, Some(600));
        assert!(cfg.no_progress_bar);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let (global, sync) = parse(&["sync", "--max-concurrent-requests", "0"]);
        assert!(Config::from_cli(global, sync).is_err());
    }

    #[test]
    fn test_rejects_zero_watch_interval() {
        let (global, sync) = parse(&["sync", "--watch-with-interval", "0"]);
        assert!(Config::from_cli(global, sync).is_err());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let (global, sync) = parse(&["--ddragon-url", "ftp://cdn", "info"]);
        assert!(Config::from_cli(global, sync).is_err());
    }
}
