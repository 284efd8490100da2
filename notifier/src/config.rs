use clap::Parser;
use domain::{ChannelId, Roster};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Missing(&'static str),

    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("ROLES is not a JSON object of channel id to {{role_id, username}}: {0}")]
    InvalidRoster(#[from] serde_json::Error),

    #[error("ROLES entry for channel {0} has no username")]
    MissingUsername(ChannelId),

    #[error("HTTP timeout must be at least one second")]
    InvalidTimeout,
}

/// Command line flags, each falling back to an environment variable
#[derive(Debug, Clone, Parser)]
#[command(name = "notifier", version, about = "Announce new uploads and live streams on Discord")]
pub struct Cli {
    /// YouTube Data API key
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Discord webhook URL
    #[arg(long, env = "DISCORD_WEBHOOK", hide_env_values = true)]
    pub discord_webhook: String,

    /// JSON object mapping channel id to {"role_id", "username"}
    #[arg(long, env = "ROLES", default_value = "{}")]
    pub roles: String,

    /// File holding the watchlist between runs
    #[arg(long, env = "WATCHLIST_PATH", default_value = "data.json")]
    pub watchlist: PathBuf,

    /// Directory for the daily log files
    #[arg(long, env = "LOG_DIR", default_value = "log/system")]
    pub log_dir: PathBuf,

    #[arg(long, env = "YOUTUBE_API_BASE", default_value = video_service::DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, env = "YOUTUBE_FEED_BASE", default_value = feed_service::DEFAULT_FEED_BASE)]
    pub feed_base: String,

    /// Per-request HTTP timeout
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub discord_webhook: Url,
    pub roster: Roster,
    pub watchlist_path: PathBuf,
    pub log_dir: PathBuf,
    pub api_base: Url,
    pub feed_base: Url,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let api_key = non_empty("API_KEY", cli.api_key)?;
        let discord_webhook = non_empty("DISCORD_WEBHOOK", cli.discord_webhook)?;
        let discord_webhook = parse_url("DISCORD_WEBHOOK", &discord_webhook)?;
        let roster: Roster = serde_json::from_str(&cli.roles)?;
        // An empty name is a substring of every title
        if let Some((channel_id, _)) = roster
            .iter()
            .find(|(_, mention)| mention.username.trim().is_empty())
        {
            return Err(ConfigError::MissingUsername(channel_id.clone()));
        }
        if cli.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(Self {
            api_key,
            discord_webhook,
            roster,
            watchlist_path: cli.watchlist,
            log_dir: cli.log_dir,
            api_base: parse_url("YOUTUBE_API_BASE", &cli.api_base)?,
            feed_base: parse_url("YOUTUBE_FEED_BASE", &cli.feed_base)?,
            http_timeout: Duration::from_secs(cli.http_timeout_secs),
        })
    }
}

fn non_empty(name: &'static str, value: String) -> Result<String, ConfigError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value)
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { name, source })
}
