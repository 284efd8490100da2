use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a single video
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a channel (content source)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Ordered, duplicate-free set of videos still waiting on a live notification.
///
/// This is the only state carried between runs. It serializes as a plain
/// JSON array of ids; duplicates in the input collapse onto their first
/// occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<VideoId>", into = "Vec<VideoId>")]
pub struct Watchlist {
    ids: Vec<VideoId>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &VideoId) -> bool {
        self.ids.contains(id)
    }

    /// Append `id` unless already present. Returns whether it was added.
    pub fn insert(&mut self, id: VideoId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Remove `id`. Returns whether it was present.
    pub fn remove(&mut self, id: &VideoId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| existing != id);
        self.ids.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &VideoId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_slice(&self) -> &[VideoId] {
        &self.ids
    }
}

impl From<Vec<VideoId>> for Watchlist {
    fn from(ids: Vec<VideoId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<Watchlist> for Vec<VideoId> {
    fn from(watchlist: Watchlist) -> Self {
        watchlist.ids
    }
}

impl FromIterator<VideoId> for Watchlist {
    fn from_iter<I: IntoIterator<Item = VideoId>>(iter: I) -> Self {
        let mut watchlist = Watchlist::new();
        for id in iter {
            watchlist.insert(id);
        }
        watchlist
    }
}

/// Broadcast state reported for a video that has live-streaming details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LiveBroadcastStatus {
    Upcoming,
    Live,
}

/// Metadata of a video as returned by the batched lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: VideoId,
    pub channel_id: ChannelId,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub live_broadcast_status: Option<LiveBroadcastStatus>,
    pub live_streaming_details_present: bool,
}

/// A video that is currently broadcasting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveVideo {
    pub id: VideoId,
    pub channel_id: ChannelId,
    pub title: String,
}

/// A regular upload that appeared within the freshness window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVideo {
    pub id: VideoId,
    pub channel_id: ChannelId,
}

/// Result of classifying a batch of candidate videos.
///
/// The three buckets never share an id. Ids in none of them are untracked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub upcoming: Vec<VideoId>,
    pub live: Vec<LiveVideo>,
    pub just_published: Vec<PublishedVideo>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.upcoming.is_empty() && self.live.is_empty() && self.just_published.is_empty()
    }

    /// Whether `id` already sits in one of the buckets
    pub fn contains(&self, id: &VideoId) -> bool {
        self.upcoming.contains(id)
            || self.live.iter().any(|video| &video.id == id)
            || self.just_published.iter().any(|video| &video.id == id)
    }
}

/// A notification decided for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub channel_id: ChannelId,
    pub video_id: VideoId,
    pub title: Option<String>,
}

impl NotificationEvent {
    pub fn watch_url(&self) -> String {
        format!("https://youtu.be/{}", self.video_id)
    }
}

/// Mention target configured for a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMention {
    /// Literal mention token, e.g. `<@&1234>`
    pub role_id: String,
    /// Display name matched against broadcast titles
    #[serde(default)]
    pub username: String,
}

/// Channels to watch and who to mention for each of them
pub type Roster = BTreeMap<ChannelId, RoleMention>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(raw: &[&str]) -> Vec<VideoId> {
        raw.iter().map(|id| VideoId::from(*id)).collect()
    }

    #[test]
    fn watchlist_insert_is_idempotent() {
        let mut watchlist = Watchlist::new();
        assert!(watchlist.insert("v1".into()));
        assert!(!watchlist.insert("v1".into()));
        assert!(watchlist.insert("v2".into()));
        assert_eq!(watchlist.as_slice(), ids(&["v1", "v2"]).as_slice());
    }

    #[test]
    fn watchlist_remove_reports_membership() {
        let mut watchlist: Watchlist = ids(&["v1", "v2"]).into();
        assert!(watchlist.remove(&"v1".into()));
        assert!(!watchlist.remove(&"v1".into()));
        assert_eq!(watchlist.as_slice(), ids(&["v2"]).as_slice());
    }

    #[test]
    fn watchlist_deserializes_without_duplicates() {
        let watchlist: Watchlist = serde_json::from_str(r#"["b","a","b","c","a"]"#).unwrap();
        assert_eq!(watchlist.as_slice(), ids(&["b", "a", "c"]).as_slice());
        assert_eq!(serde_json::to_string(&watchlist).unwrap(), r#"["b","a","c"]"#);
    }

    #[test]
    fn roster_parses_role_object() {
        let roster: Roster = serde_json::from_str(
            r#"{"UC1":{"role_id":"<@&1>","username":"Alice"},"UC2":{"role_id":"<@&2>"}}"#,
        )
        .unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[&ChannelId::from("UC1")].username, "Alice");
        assert_eq!(roster[&ChannelId::from("UC2")].username, "");
    }

    #[test]
    fn watch_url_uses_short_link() {
        let event = NotificationEvent {
            channel_id: "c1".into(),
            video_id: "abc123".into(),
            title: None,
        };
        assert_eq!(event.watch_url(), "https://youtu.be/abc123");
    }
}
