//! Decides which classified videos are notified and what stays on the watchlist.

use domain::{Classification, NotificationEvent, Watchlist};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub events: Vec<NotificationEvent>,
    pub next_watchlist: Watchlist,
    pub changed: bool,
}

/// Reconcile one run's classification against the stored watchlist.
///
/// Upcoming broadcasts join the watchlist. A live broadcast is announced only
/// when it was already on the watchlist, and then leaves it; broadcasts that
/// go live between two polls are never announced. Fresh uploads are always
/// announced and never touch the watchlist.
pub fn reconcile(watchlist: &Watchlist, classified: &Classification) -> Reconciliation {
    let mut next_watchlist = watchlist.clone();
    let mut events = Vec::new();
    let mut changed = false;

    for id in &classified.upcoming {
        changed |= next_watchlist.insert(id.clone());
    }

    for live in &classified.live {
        if !watchlist.contains(&live.id) {
            tracing::debug!(
                event = "live_untracked",
                video_id = %live.id,
                "live video was never seen upcoming, skipping"
            );
            continue;
        }
        events.push(NotificationEvent {
            channel_id: live.channel_id.clone(),
            video_id: live.id.clone(),
            title: Some(live.title.clone()),
        });
        next_watchlist.remove(&live.id);
        changed = true;
    }

    for published in &classified.just_published {
        events.push(NotificationEvent {
            channel_id: published.channel_id.clone(),
            video_id: published.id.clone(),
            title: None,
        });
    }

    Reconciliation {
        events,
        next_watchlist,
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{LiveVideo, PublishedVideo, VideoId};
    use pretty_assertions::assert_eq;

    fn watchlist(raw: &[&str]) -> Watchlist {
        raw.iter().map(|id| VideoId::from(*id)).collect()
    }

    fn live(id: &str, channel: &str, title: &str) -> LiveVideo {
        LiveVideo {
            id: id.into(),
            channel_id: channel.into(),
            title: title.to_string(),
        }
    }

    #[test]
    fn upcoming_joins_empty_watchlist() {
        let classified = Classification {
            upcoming: vec!["v1".into()],
            ..Default::default()
        };

        let result = reconcile(&Watchlist::new(), &classified);

        assert_eq!(result.next_watchlist, watchlist(&["v1"]));
        assert!(result.events.is_empty());
        assert!(result.changed);
    }

    #[test]
    fn tracked_live_video_is_announced_once_and_released() {
        let classified = Classification {
            live: vec![live("v1", "c1", "Stream")],
            ..Default::default()
        };

        let result = reconcile(&watchlist(&["v1"]), &classified);

        assert_eq!(
            result.events,
            vec![NotificationEvent {
                channel_id: "c1".into(),
                video_id: "v1".into(),
                title: Some("Stream".to_string()),
            }]
        );
        assert_eq!(result.next_watchlist, Watchlist::new());
        assert!(result.changed);

        // Next poll: v1 is still live but no longer tracked
        let again = reconcile(&result.next_watchlist, &classified);
        assert!(again.events.is_empty());
        assert!(!again.changed);
    }

    #[test]
    fn untracked_live_video_is_skipped() {
        let classified = Classification {
            live: vec![live("v9", "c9", "Surprise")],
            ..Default::default()
        };

        let result = reconcile(&Watchlist::new(), &classified);

        assert!(result.events.is_empty());
        assert_eq!(result.next_watchlist, Watchlist::new());
        assert!(!result.changed);
    }

    #[test]
    fn just_published_is_always_announced_without_touching_watchlist() {
        let classified = Classification {
            just_published: vec![PublishedVideo {
                id: "v5".into(),
                channel_id: "c2".into(),
            }],
            ..Default::default()
        };

        for start in [Watchlist::new(), watchlist(&["v5", "v7"])] {
            let result = reconcile(&start, &classified);
            assert_eq!(
                result.events,
                vec![NotificationEvent {
                    channel_id: "c2".into(),
                    video_id: "v5".into(),
                    title: None,
                }]
            );
            assert_eq!(result.next_watchlist, start);
            assert!(!result.changed);
        }
    }

    #[test]
    fn upcoming_retention_is_idempotent() {
        let classified = Classification {
            upcoming: vec!["v1".into(), "v2".into()],
            ..Default::default()
        };

        let once = reconcile(&watchlist(&["v0"]), &classified);
        let twice = reconcile(&once.next_watchlist, &classified);

        assert_eq!(once.next_watchlist, watchlist(&["v0", "v1", "v2"]));
        assert_eq!(twice.next_watchlist, once.next_watchlist);
        assert!(!twice.changed);
    }

    #[test]
    fn live_events_precede_fresh_uploads() {
        let classified = Classification {
            upcoming: vec!["u1".into()],
            live: vec![live("l1", "c1", "a"), live("l2", "c2", "b")],
            just_published: vec![PublishedVideo {
                id: "p1".into(),
                channel_id: "c3".into(),
            }],
        };

        let result = reconcile(&watchlist(&["l2", "l1", "keep"]), &classified);

        let order: Vec<&str> = result.events.iter().map(|e| e.video_id.as_str()).collect();
        assert_eq!(order, vec!["l1", "l2", "p1"]);
        assert_eq!(result.next_watchlist, watchlist(&["keep", "u1"]));
        assert!(result.changed);
    }
}
