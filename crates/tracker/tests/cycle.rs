use chrono::{Duration, Utc};
use datastore::{JsonFileStore, WatchlistStore};
use domain::{ChannelId, RoleMention, Roster, VideoId, Watchlist};
use feed_service::RssFeedClient;
use notify_service::{DiscordWebhook, Dispatcher};
use pretty_assertions::assert_eq;
use sandbox::{BroadcastState, SandboxState, SandboxVideo};
use std::path::Path;
use std::sync::Arc;
use tracker::Tracker;
use video_service::YouTubeVideosClient;

async fn start_sandbox(state: &SandboxState) -> String {
    let addr = sandbox::spawn(state.clone(), "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    format!("http://{addr}")
}

fn roster() -> Roster {
    Roster::from([
        (
            ChannelId::from("UC-alice"),
            RoleMention {
                role_id: "<@&100>".to_string(),
                username: "Alice".to_string(),
            },
        ),
        (
            ChannelId::from("UC-bob"),
            RoleMention {
                role_id: "<@&200>".to_string(),
                username: "Bob".to_string(),
            },
        ),
    ])
}

fn build_tracker(base: &str, watchlist_path: &Path) -> Tracker {
    let http = reqwest_client();
    Tracker::new(
        Arc::new(RssFeedClient::with_client(http.clone(), base)),
        Arc::new(YouTubeVideosClient::with_client(http.clone(), base, "test-key")),
        Arc::new(JsonFileStore::new(watchlist_path)),
        Dispatcher::new(
            roster(),
            Arc::new(DiscordWebhook::with_client(http, format!("{base}/webhook"))),
        ),
    )
}

fn reqwest_client() -> reqwest::Client {
    reqwest::Client::new()
}

fn stream(id: &str, channel: &str, title: &str, state: BroadcastState) -> SandboxVideo {
    SandboxVideo {
        id: id.to_string(),
        channel_id: channel.to_string(),
        title: title.to_string(),
        description: String::new(),
        channel_title: String::new(),
        published_at: Utc::now() - Duration::hours(2),
        broadcast: Some(state),
    }
}

fn watchlist_on_disk(path: &Path) -> Watchlist {
    JsonFileStore::new(path).load().unwrap()
}

#[tokio::test]
async fn scheduled_stream_is_announced_once_when_it_goes_live() {
    let state = SandboxState::new();
    let base = start_sandbox(&state).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    let tracker = build_tracker(&base, &path);

    state.upsert_video(stream(
        "collab1",
        "UC-alice",
        "Alice and Bob play chess",
        BroadcastState::Upcoming,
    ));
    state.set_feed("UC-alice", Some("collab1"));
    state.set_feed("UC-bob", None);

    let first = tracker.run_once().await;
    assert_eq!(first.channels_polled, 2);
    assert_eq!(first.feeds_resolved, 1);
    assert_eq!(first.events, 0);
    assert!(first.watchlist_saved);
    assert_eq!(
        watchlist_on_disk(&path),
        Watchlist::from(vec![VideoId::from("collab1")])
    );

    // A newer upload pushes the stream out of the feed; the watchlist keeps it
    state.upsert_video(SandboxVideo {
        published_at: Utc::now() - Duration::days(1),
        broadcast: None,
        ..stream("older", "UC-alice", "Old upload", BroadcastState::Completed)
    });
    state.set_feed("UC-alice", Some("older"));
    state.set_broadcast("collab1", Some(BroadcastState::Live));

    let second = tracker.run_once().await;
    assert_eq!(second.candidates, 2);
    assert_eq!(second.delivered, 1);
    assert!(second.watchlist_saved);
    assert!(watchlist_on_disk(&path).is_empty());

    let third = tracker.run_once().await;
    assert_eq!(third.events, 0);
    assert!(!third.watchlist_saved);

    assert_eq!(
        state.messages(),
        vec!["<@&100> <@&100> <@&200>\nhttps://youtu.be/collab1".to_string()]
    );
}

#[tokio::test]
async fn fresh_upload_is_announced_without_tracking() {
    let state = SandboxState::new();
    let base = start_sandbox(&state).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    let tracker = build_tracker(&base, &path);

    state.upsert_video(SandboxVideo {
        published_at: Utc::now(),
        broadcast: None,
        ..stream("new1", "UC-bob", "Fresh upload", BroadcastState::Completed)
    });
    state.set_feed("UC-bob", Some("new1"));

    let report = tracker.run_once().await;

    assert_eq!(report.delivered, 1);
    assert!(!report.watchlist_saved);
    assert!(!path.exists());
    assert_eq!(
        state.messages(),
        vec!["<@&200>\nhttps://youtu.be/new1".to_string()]
    );
}

#[tokio::test]
async fn failing_webhook_does_not_block_watchlist_update() {
    let state = SandboxState::new();
    let base = start_sandbox(&state).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    JsonFileStore::new(&path)
        .save(&Watchlist::from(vec![
            VideoId::from("live1"),
            VideoId::from("live2"),
            VideoId::from("later"),
        ]))
        .unwrap();
    let tracker = build_tracker(&base, &path);

    state.upsert_video(stream("live1", "UC-alice", "one", BroadcastState::Live));
    state.upsert_video(stream("live2", "UC-bob", "two", BroadcastState::Live));
    state.upsert_video(stream("later", "UC-bob", "three", BroadcastState::Upcoming));
    state.set_webhook_status(500);

    let report = tracker.run_once().await;

    assert_eq!(report.events, 2);
    assert_eq!(report.delivered, 0);
    assert!(report.watchlist_saved);
    assert_eq!(
        watchlist_on_disk(&path),
        Watchlist::from(vec![VideoId::from("later")])
    );
}

#[tokio::test]
async fn corrupt_watchlist_is_treated_as_empty() {
    let state = SandboxState::new();
    let base = start_sandbox(&state).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, "not json").unwrap();
    let tracker = build_tracker(&base, &path);

    state.upsert_video(stream("up1", "UC-bob", "soon", BroadcastState::Upcoming));
    state.set_feed("UC-bob", Some("up1"));

    let report = tracker.run_once().await;

    assert!(report.watchlist_saved);
    assert_eq!(
        watchlist_on_disk(&path),
        Watchlist::from(vec![VideoId::from("up1")])
    );
}

#[tokio::test]
async fn unreachable_services_leave_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    JsonFileStore::new(&path)
        .save(&Watchlist::from(vec![VideoId::from("v1")]))
        .unwrap();
    // Nothing listens on the discard port
    let tracker = build_tracker("http://127.0.0.1:9", &path);

    let report = tracker.run_once().await;

    assert_eq!(report.feeds_resolved, 0);
    assert_eq!(report.candidates, 1);
    assert_eq!(report.events, 0);
    assert!(!report.watchlist_saved);
    assert_eq!(
        watchlist_on_disk(&path),
        Watchlist::from(vec![VideoId::from("v1")])
    );
}
