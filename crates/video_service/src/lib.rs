pub mod wire;

use async_trait::async_trait;
use domain::{VideoId, VideoMetadata};
use std::time::Duration;
use wire::VideosListResponse;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// Upper bound of ids accepted by a single `videos.list` call
pub const MAX_IDS_PER_REQUEST: usize = 50;

/// Parts requested from `videos.list`
pub const VIDEO_PARTS: &str = "snippet,liveStreamingDetails";

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("videos.list returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

// The request URL carries the API key
impl From<reqwest::Error> for MetadataError {
    fn from(err: reqwest::Error) -> Self {
        MetadataError::Http(err.without_url())
    }
}

/// Batched lookup of video metadata
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Metadata for the ids that still exist; unknown ids are simply absent
    async fn fetch_video_metadata(
        &self,
        ids: &[VideoId],
    ) -> Result<Vec<VideoMetadata>, MetadataError>;
}

/// MetadataSource backed by the YouTube Data API
#[derive(Debug, Clone)]
pub struct YouTubeVideosClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeVideosClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn videos_url(&self) -> String {
        format!("{}/youtube/v3/videos", self.base_url)
    }

    async fn list_chunk(&self, ids: &[VideoId]) -> Result<VideosListResponse, MetadataError> {
        let joined = ids.iter().map(VideoId::as_str).collect::<Vec<_>>().join(",");
        let response = self
            .client
            .get(self.videos_url())
            .query(&[
                ("id", joined.as_str()),
                ("part", VIDEO_PARTS),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetadataSource for YouTubeVideosClient {
    async fn fetch_video_metadata(
        &self,
        ids: &[VideoId],
    ) -> Result<Vec<VideoMetadata>, MetadataError> {
        let mut metadata = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let response = self.list_chunk(chunk).await?;
            tracing::debug!(
                event = "videos_listed",
                requested = chunk.len(),
                returned = response.items.len(),
                "videos.list chunk fetched"
            );

            for video in response.items {
                match VideoMetadata::try_from(video) {
                    Ok(item) => metadata.push(item),
                    Err(err) => {
                        tracing::warn!(
                            event = "video_item_skipped",
                            error = %err,
                            "skipping video item"
                        );
                    }
                }
            }
        }

        Ok(metadata)
    }
}
