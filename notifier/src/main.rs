mod config;
mod logging;

use anyhow::Context;
use clap::Parser;
use config::{Cli, Config};
use datastore::JsonFileStore;
use feed_service::RssFeedClient;
use notify_service::{DiscordWebhook, Dispatcher};
use std::sync::Arc;
use tracker::Tracker;
use video_service::YouTubeVideosClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    allow_missing_env_file(dotenvy::dotenv())?;

    let config = Config::from_cli(Cli::parse()).context("invalid configuration")?;
    let _log_guard = logging::init(&config.log_dir)?;

    tracing::info!(
        event = "run_started",
        channels = config.roster.len(),
        watchlist = %config.watchlist_path.display(),
        "notifier v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let tracker = build_tracker(&config)?;
    tracker.run_once().await;

    Ok(())
}

/// A missing .env is fine, settings may come from the real environment
fn allow_missing_env_file<T>(loaded: dotenvy::Result<T>) -> anyhow::Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err).context("failed to load .env"),
    }
}

fn build_tracker(config: &Config) -> anyhow::Result<Tracker> {
    let feeds = RssFeedClient::new(config.feed_base.as_str(), config.http_timeout)
        .context("failed to build feed client")?;
    let metadata = YouTubeVideosClient::new(
        config.api_base.as_str(),
        config.api_key.as_str(),
        config.http_timeout,
    )
    .context("failed to build YouTube client")?;
    let webhook = DiscordWebhook::new(config.discord_webhook.as_str(), config.http_timeout)
        .context("failed to build webhook client")?;

    Ok(Tracker::new(
        Arc::new(feeds),
        Arc::new(metadata),
        Arc::new(JsonFileStore::new(&config.watchlist_path)),
        Dispatcher::new(config.roster.clone(), Arc::new(webhook)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = dotenvy::from_path(dir.path().join(".env"));
        assert!(allow_missing_env_file(loaded).is_ok());
    }

    #[test]
    fn malformed_env_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "this is not an assignment\n").unwrap();

        let err = allow_missing_env_file(dotenvy::from_path(&path)).unwrap_err();

        assert!(err.to_string().contains(".env"));
    }
}
