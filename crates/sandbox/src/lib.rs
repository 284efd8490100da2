//! Local stand-in for the channel feeds, the YouTube Data API and a Discord webhook.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use video_service::wire::{
    LiveStreamingDetails, PageInfo, VIDEO_KIND, VIDEO_LIST_KIND, Video, VideoSnippet,
    VideosListResponse,
};

/// Broadcast phase of a sandbox video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastState {
    Upcoming,
    Live,
    Completed,
}

impl BroadcastState {
    fn live_broadcast_content(self) -> &'static str {
        match self {
            BroadcastState::Upcoming => "upcoming",
            BroadcastState::Live => "live",
            BroadcastState::Completed => "none",
        }
    }
}

/// A video known to the sandbox
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxVideo {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_title: String,
    pub published_at: DateTime<Utc>,
    /// `None` for regular uploads
    #[serde(default)]
    pub broadcast: Option<BroadcastState>,
}

impl SandboxVideo {
    fn to_wire(&self, include_snippet: bool, include_live_streaming: bool) -> Video {
        let published_at = self.published_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        Video {
            kind: VIDEO_KIND.to_string(),
            etag: format!("etag-{}", self.id),
            id: self.id.clone(),
            snippet: include_snippet.then(|| VideoSnippet {
                published_at: published_at.clone(),
                channel_id: self.channel_id.clone(),
                title: self.title.clone(),
                description: self.description.clone(),
                channel_title: self.channel_title.clone(),
                live_broadcast_content: Some(
                    self.broadcast
                        .map_or("none", BroadcastState::live_broadcast_content)
                        .to_string(),
                ),
            }),
            live_streaming_details: self
                .broadcast
                .filter(|_| include_live_streaming)
                .map(|state| LiveStreamingDetails {
                    active_live_chat_id: (state == BroadcastState::Live)
                        .then(|| format!("live-chat-{}", self.id)),
                    scheduled_start_time: Some(published_at.clone()),
                    ..Default::default()
                }),
        }
    }
}

struct Inner {
    videos: HashMap<String, SandboxVideo>,
    feeds: HashMap<String, Option<String>>,
    messages: Vec<String>,
    webhook_status: u16,
    video_requests: usize,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            videos: HashMap::new(),
            feeds: HashMap::new(),
            messages: Vec::new(),
            webhook_status: StatusCode::NO_CONTENT.as_u16(),
            video_requests: 0,
        }
    }
}

/// Shared in-memory state behind every sandbox route
#[derive(Clone, Default)]
pub struct SandboxState {
    inner: Arc<RwLock<Inner>>,
}

impl SandboxState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a video
    pub fn upsert_video(&self, video: SandboxVideo) {
        self.inner
            .write()
            .expect("Failed to acquire write lock on sandbox state")
            .videos
            .insert(video.id.clone(), video);
    }

    /// Change the broadcast phase of a known video
    pub fn set_broadcast(&self, video_id: &str, state: Option<BroadcastState>) {
        if let Some(video) = self
            .inner
            .write()
            .expect("Failed to acquire write lock on sandbox state")
            .videos
            .get_mut(video_id)
        {
            video.broadcast = state;
        }
    }

    /// Make `video_id` the newest entry of `channel_id`'s feed; `None` empties the feed
    pub fn set_feed(&self, channel_id: &str, video_id: Option<&str>) {
        self.inner
            .write()
            .expect("Failed to acquire write lock on sandbox state")
            .feeds
            .insert(channel_id.to_string(), video_id.map(str::to_string));
    }

    /// Status the webhook answers with
    pub fn set_webhook_status(&self, status: u16) {
        self.inner
            .write()
            .expect("Failed to acquire write lock on sandbox state")
            .webhook_status = status;
    }

    /// Webhook message bodies received so far
    pub fn messages(&self) -> Vec<String> {
        self.inner
            .read()
            .expect("Failed to acquire read lock on sandbox state")
            .messages
            .clone()
    }

    /// Number of `videos.list` calls served
    pub fn video_requests(&self) -> usize {
        self.inner
            .read()
            .expect("Failed to acquire read lock on sandbox state")
            .video_requests
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    #[serde(default)]
    pub channel_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VideosListParams {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub part: String,
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFeedRequest {
    pub channel_id: String,
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookStatusRequest {
    pub status: u16,
}

/// Response for successful control calls
#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ApiError {
    code: u16,
    message: String,
}

#[derive(Debug, Serialize)]
struct ApiErrorResponse {
    error: ApiError,
}

fn atom_feed(channel_id: &str, video_id: Option<&str>) -> String {
    let entry = video_id
        .map(|video_id| {
            format!(
                " <entry>\n  <id>yt:video:{video_id}</id>\n  <yt:videoId>{video_id}</yt:videoId>\n  <yt:channelId>{channel_id}</yt:channelId>\n </entry>\n"
            )
        })
        .unwrap_or_default();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<feed xmlns:yt=\"http://www.youtube.com/xml/schemas/2015\" xmlns=\"http://www.w3.org/2005/Atom\">\n <yt:channelId>{channel_id}</yt:channelId>\n{entry}</feed>\n"
    )
}

async fn channel_feed(
    State(state): State<SandboxState>,
    Query(params): Query<FeedParams>,
) -> impl IntoResponse {
    let latest = state
        .inner
        .read()
        .expect("Failed to acquire read lock on sandbox state")
        .feeds
        .get(&params.channel_id)
        .cloned();

    match latest {
        Some(video_id) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/atom+xml; charset=UTF-8")],
            atom_feed(&params.channel_id, video_id.as_deref()),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "channel not found").into_response(),
    }
}

async fn videos_list(
    State(state): State<SandboxState>,
    Query(params): Query<VideosListParams>,
) -> impl IntoResponse {
    if params.key.is_empty() {
        let error = ApiErrorResponse {
            error: ApiError {
                code: 403,
                message: "The request is missing a valid API key.".to_string(),
            },
        };
        return (StatusCode::FORBIDDEN, Json(error)).into_response();
    }

    // Parse which parts are requested
    let parts: Vec<&str> = params.part.split(',').map(|s| s.trim()).collect();
    let include_snippet = params.part.is_empty() || parts.contains(&"snippet");
    let include_live_streaming =
        params.part.is_empty() || parts.contains(&"liveStreamingDetails");

    let items: Vec<Video> = {
        let mut inner = state
            .inner
            .write()
            .expect("Failed to acquire write lock on sandbox state");
        inner.video_requests += 1;
        let items = params
            .id
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .filter_map(|id| inner.videos.get(id))
            .map(|video| video.to_wire(include_snippet, include_live_streaming))
            .collect();
        items
    };

    let total = i32::try_from(items.len()).unwrap_or(i32::MAX);
    let response = VideosListResponse {
        kind: VIDEO_LIST_KIND.to_string(),
        etag: "etag-list".to_string(),
        page_info: Some(PageInfo {
            total_results: total,
            results_per_page: total,
        }),
        next_page_token: None,
        items,
    };

    (StatusCode::OK, Json(response)).into_response()
}

async fn webhook(
    State(state): State<SandboxState>,
    Json(message): Json<WebhookMessage>,
) -> impl IntoResponse {
    let status = {
        let mut inner = state
            .inner
            .write()
            .expect("Failed to acquire write lock on sandbox state");
        let status = inner.webhook_status;
        if StatusCode::from_u16(status).is_ok_and(|code| code.is_success()) {
            inner.messages.push(message.content);
        }
        status
    };
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn create_video(
    State(state): State<SandboxState>,
    Json(video): Json<SandboxVideo>,
) -> impl IntoResponse {
    let id = video.id.clone();
    state.upsert_video(video);

    let response = CreateResponse {
        success: true,
        message: format!("Video '{id}' created successfully"),
    };
    (StatusCode::CREATED, Json(response))
}

async fn set_feed(
    State(state): State<SandboxState>,
    Json(request): Json<SetFeedRequest>,
) -> impl IntoResponse {
    state.set_feed(&request.channel_id, request.video_id.as_deref());

    let response = CreateResponse {
        success: true,
        message: format!("Feed for '{}' updated", request.channel_id),
    };
    (StatusCode::OK, Json(response))
}

async fn list_messages(State(state): State<SandboxState>) -> impl IntoResponse {
    Json(state.messages())
}

async fn set_webhook_status(
    State(state): State<SandboxState>,
    Json(request): Json<WebhookStatusRequest>,
) -> impl IntoResponse {
    state.set_webhook_status(request.status);
    StatusCode::NO_CONTENT
}

/// Create the router serving every sandbox endpoint
pub fn create_router(state: SandboxState) -> Router {
    Router::new()
        .route("/feeds/videos.xml", get(channel_feed))
        .route("/youtube/v3/videos", get(videos_list))
        .route("/webhook", post(webhook))
        .route("/control/videos", post(create_video))
        .route("/control/feeds", post(set_feed))
        .route("/control/messages", get(list_messages))
        .route("/control/webhook_status", post(set_webhook_status))
        .with_state(state)
}

/// Serve the sandbox on `addr` in a background task and return the bound address
pub async fn spawn(state: SandboxState, addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, create_router(state)).await {
            tracing::error!(event = "sandbox_stopped", error = %err, "sandbox server stopped");
        }
    });
    Ok(local_addr)
}
