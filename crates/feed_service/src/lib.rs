//! Resolves the latest video of each watched channel from its Atom feed.

use async_trait::async_trait;
use domain::{ChannelId, VideoId};
use futures::future::join_all;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

pub const DEFAULT_FEED_BASE: &str = "https://www.youtube.com";

static VIDEO_ID_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<yt:videoId>([^<]+)</yt:videoId>").expect("video id pattern is valid")
});

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("feed returned HTTP {status}")]
    Status { status: u16 },
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Http(err.without_url())
    }
}

/// Source of the most recent video id per channel
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// `Ok(None)` when the feed carries no identifiable video
    async fn fetch_latest_video_id(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<VideoId>, FeedError>;
}

/// Outcome of polling one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPoll {
    pub channel_id: ChannelId,
    pub latest: Option<VideoId>,
}

/// Resolve the latest video of one channel, degrading every failure to `None`
pub async fn resolve_latest(source: &dyn FeedSource, channel_id: &ChannelId) -> Option<VideoId> {
    match source.fetch_latest_video_id(channel_id).await {
        Ok(Some(video_id)) => {
            tracing::debug!(
                event = "feed_resolved",
                channel_id = %channel_id,
                video_id = %video_id,
                "latest video resolved"
            );
            Some(video_id)
        }
        Ok(None) => {
            tracing::warn!(
                event = "feed_unavailable",
                channel_id = %channel_id,
                "no videos found in feed"
            );
            None
        }
        Err(err) => {
            tracing::warn!(
                event = "feed_unavailable",
                channel_id = %channel_id,
                error = %err,
                "error fetching feed"
            );
            None
        }
    }
}

/// Poll every channel concurrently and wait for all of them to settle.
///
/// Results come back in the order of `channels`.
pub async fn poll_channels<'a, I>(source: &dyn FeedSource, channels: I) -> Vec<FeedPoll>
where
    I: IntoIterator<Item = &'a ChannelId>,
{
    join_all(channels.into_iter().map(|channel_id| async move {
        FeedPoll {
            channel_id: channel_id.clone(),
            latest: resolve_latest(source, channel_id).await,
        }
    }))
    .await
}

/// Extract the first video id out of an Atom feed body
pub fn parse_latest_video_id(body: &str) -> Option<VideoId> {
    VIDEO_ID_TAG
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().trim())
        .filter(|id| !id.is_empty())
        .map(VideoId::new)
}

/// FeedSource reading `/feeds/videos.xml?channel_id=...`
#[derive(Debug, Clone)]
pub struct RssFeedClient {
    client: reqwest::Client,
    base_url: String,
}

impl RssFeedClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn feed_url(&self) -> String {
        format!("{}/feeds/videos.xml", self.base_url)
    }
}

#[async_trait]
impl FeedSource for RssFeedClient {
    async fn fetch_latest_video_id(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<VideoId>, FeedError> {
        let response = self
            .client
            .get(self.feed_url())
            .query(&[("channel_id", channel_id.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(parse_latest_video_id(&body))
    }
}
