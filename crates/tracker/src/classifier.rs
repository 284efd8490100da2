//! Sorts candidate videos into lifecycle buckets.

use chrono::{DateTime, Duration, Utc};
use domain::{
    Classification, LiveBroadcastStatus, LiveVideo, PublishedVideo, VideoId, VideoMetadata,
};
use video_service::MetadataSource;

/// Seconds after publishing during which a regular upload still counts as new
pub const FRESHNESS_WINDOW_SECS: i64 = 55;

pub fn freshness_window() -> Duration {
    Duration::seconds(FRESHNESS_WINDOW_SECS)
}

/// Classify metadata as of `now`.
///
/// Buckets keep the order of `metadata`; repeated items after the first are ignored.
pub fn classify(metadata: &[VideoMetadata], now: DateTime<Utc>) -> Classification {
    let mut classification = Classification::default();

    for video in metadata {
        if classification.contains(&video.id) {
            continue;
        }

        if video.live_streaming_details_present {
            match video.live_broadcast_status {
                Some(LiveBroadcastStatus::Upcoming) => {
                    classification.upcoming.push(video.id.clone());
                }
                Some(LiveBroadcastStatus::Live) => classification.live.push(LiveVideo {
                    id: video.id.clone(),
                    channel_id: video.channel_id.clone(),
                    title: video.title.clone(),
                }),
                // Finished broadcast
                None => {}
            }
        } else if now - video.published_at < freshness_window() {
            classification.just_published.push(PublishedVideo {
                id: video.id.clone(),
                channel_id: video.channel_id.clone(),
            });
        }
    }

    classification
}

/// Fetch metadata for `ids` and classify it.
///
/// A failed or empty lookup yields empty buckets.
pub async fn classify_candidates(
    source: &dyn MetadataSource,
    ids: &[VideoId],
    now: DateTime<Utc>,
) -> Classification {
    if ids.is_empty() {
        tracing::info!(event = "classification_skipped", "no candidate videos to check");
        return Classification::default();
    }

    let metadata = match source.fetch_video_metadata(ids).await {
        Ok(metadata) => metadata,
        Err(err) => {
            tracing::warn!(
                event = "classification_unavailable",
                candidates = ids.len(),
                error = %err,
                "error checking video status"
            );
            return Classification::default();
        }
    };

    if metadata.is_empty() {
        tracing::warn!(
            event = "classification_unavailable",
            candidates = ids.len(),
            "no videos found"
        );
        return Classification::default();
    }

    let classification = classify(&metadata, now);
    tracing::info!(
        event = "videos_classified",
        candidates = ids.len(),
        upcoming = classification.upcoming.len(),
        live = classification.live.len(),
        just_published = classification.just_published.len(),
        "videos classified"
    );
    classification
}
