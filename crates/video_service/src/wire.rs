//! `youtube#videoListResponse` as served by `/youtube/v3/videos`.

use chrono::{DateTime, Utc};
use domain::{ChannelId, LiveBroadcastStatus, VideoId, VideoMetadata};
use serde::{Deserialize, Serialize};

pub const VIDEO_LIST_KIND: &str = "youtube#videoListResponse";
pub const VIDEO_KIND: &str = "youtube#video";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideosListResponse {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub etag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_results: i32,
    pub results_per_page: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub etag: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<VideoSnippet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub published_at: String,
    pub channel_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_title: String,
    /// `none`, `upcoming` or `live`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_broadcast_content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamingDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_live_chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_end_time: Option<String>,
    /// The API encodes this count as a decimal string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent_viewers: Option<String>,
}

/// Why an item could not be turned into [`VideoMetadata`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidItem {
    #[error("video {0} has no snippet")]
    MissingSnippet(String),

    #[error("video {id} has unparseable publishedAt {published_at:?}")]
    PublishedAt { id: String, published_at: String },
}

pub fn parse_broadcast_status(content: Option<&str>) -> Option<LiveBroadcastStatus> {
    match content {
        Some("upcoming") => Some(LiveBroadcastStatus::Upcoming),
        Some("live") => Some(LiveBroadcastStatus::Live),
        _ => None,
    }
}

impl TryFrom<Video> for VideoMetadata {
    type Error = InvalidItem;

    fn try_from(video: Video) -> Result<Self, Self::Error> {
        let Some(snippet) = video.snippet else {
            return Err(InvalidItem::MissingSnippet(video.id));
        };

        let published_at = DateTime::parse_from_rfc3339(&snippet.published_at)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|_| InvalidItem::PublishedAt {
                id: video.id.clone(),
                published_at: snippet.published_at.clone(),
            })?;

        Ok(VideoMetadata {
            id: VideoId::new(video.id),
            channel_id: ChannelId::new(snippet.channel_id),
            title: snippet.title,
            published_at,
            live_broadcast_status: parse_broadcast_status(snippet.live_broadcast_content.as_deref()),
            live_streaming_details_present: video.live_streaming_details.is_some(),
        })
    }
}
