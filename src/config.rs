//! Runtime configuration read from the environment.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::environment::{get_env_var, parse_positive};
use crate::error::{Result, WatchError};
use crate::rss::is_valid_url;

pub const DEFAULT_FEED_URL: &str = "https://cvefeed.io/rssfeed/latest.xml";
pub const DEFAULT_DATABASE_PATH: &str = "cve_data.db";
pub const DEFAULT_MAX_ENTRIES: usize = 10;
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Clone)]
pub struct Config {
    pub feed_url: String,
    pub webhook_url: String,
    pub database_path: PathBuf,
    /// How many entries from the front of the feed are considered per run.
    pub max_entries: usize,
    /// Per-request timeout for feed and webhook calls; `None` waits forever.
    pub http_timeout: Option<Duration>,
    pub log_dir: PathBuf,
}

impl Config {
    /// Loads the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(get_env_var)
    }

    /// Builds the configuration from any name -> value lookup. Blank values
    /// must be reported as `None`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let feed_url = lookup("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string());
        if !is_valid_url(&feed_url) {
            return Err(WatchError::config(format!(
                "FEED_URL is not a valid http(s) URL: {}",
                feed_url
            )));
        }

        let webhook_url = lookup("DISCORD_WEBHOOK_URL").ok_or_else(|| {
            WatchError::config("DISCORD_WEBHOOK_URL environment variable required")
        })?;
        if !is_valid_url(&webhook_url) {
            return Err(WatchError::config(
                "DISCORD_WEBHOOK_URL is not a valid http(s) URL",
            ));
        }

        let max_entries = match lookup("MAX_ENTRIES") {
            Some(value) => {
                let max = parse_positive("MAX_ENTRIES", &value).map_err(WatchError::Config)?;
                max as usize
            }
            None => DEFAULT_MAX_ENTRIES,
        };

        let http_timeout = lookup("HTTP_TIMEOUT_SECS")
            .map(|value| parse_positive("HTTP_TIMEOUT_SECS", &value))
            .transpose()
            .map_err(WatchError::Config)?
            .map(Duration::from_secs);

        Ok(Config {
            feed_url,
            webhook_url,
            database_path: lookup("DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
                .into(),
            max_entries,
            http_timeout,
            log_dir: lookup("LOG_DIR")
                .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())
                .into(),
        })
    }
}

// The webhook URL embeds its own credential, so it never reaches the logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("feed_url", &self.feed_url)
            .field("webhook_url", &"<redacted>")
            .field("database_path", &self.database_path)
            .field("max_entries", &self.max_entries)
            .field("http_timeout", &self.http_timeout)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}
