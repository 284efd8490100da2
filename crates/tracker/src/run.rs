use crate::classifier::classify_candidates;
use crate::engine::reconcile;
use chrono::{DateTime, Utc};
use datastore::WatchlistStore;
use domain::{VideoId, Watchlist};
use feed_service::{FeedPoll, FeedSource, poll_channels};
use notify_service::Dispatcher;
use std::collections::HashSet;
use std::sync::Arc;
use video_service::MetadataSource;

/// Summary of a single polling run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub channels_polled: usize,
    pub feeds_resolved: usize,
    pub candidates: usize,
    pub events: usize,
    pub delivered: usize,
    pub watchlist_len: usize,
    pub watchlist_saved: bool,
}

/// One polling run: feeds, classification, transitions, delivery, persistence
pub struct Tracker {
    feeds: Arc<dyn FeedSource>,
    metadata: Arc<dyn MetadataSource>,
    store: Arc<dyn WatchlistStore>,
    dispatcher: Dispatcher,
}

impl Tracker {
    pub fn new(
        feeds: Arc<dyn FeedSource>,
        metadata: Arc<dyn MetadataSource>,
        store: Arc<dyn WatchlistStore>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            feeds,
            metadata,
            store,
            dispatcher,
        }
    }

    pub async fn run_once(&self) -> RunReport {
        self.run_at(Utc::now()).await
    }

    /// Run with `now` as the classification time
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunReport {
        let polls = poll_channels(self.feeds.as_ref(), self.dispatcher.roster().keys()).await;
        let watchlist = self.load_watchlist();

        let candidates = candidate_ids(&watchlist, &polls);
        let classified = classify_candidates(self.metadata.as_ref(), &candidates, now).await;
        let outcome = reconcile(&watchlist, &classified);

        let delivered = self.dispatcher.dispatch_all(&outcome.events).await;

        let watchlist_saved = outcome.changed && self.save_watchlist(&outcome.next_watchlist);

        let report = RunReport {
            channels_polled: polls.len(),
            feeds_resolved: polls.iter().filter(|poll| poll.latest.is_some()).count(),
            candidates: candidates.len(),
            events: outcome.events.len(),
            delivered,
            watchlist_len: outcome.next_watchlist.len(),
            watchlist_saved,
        };
        tracing::info!(
            event = "run_finished",
            channels = report.channels_polled,
            resolved = report.feeds_resolved,
            candidates = report.candidates,
            events = report.events,
            delivered = report.delivered,
            watchlist = report.watchlist_len,
            saved = report.watchlist_saved,
            "run finished"
        );
        report
    }

    fn load_watchlist(&self) -> Watchlist {
        match self.store.load() {
            Ok(watchlist) => watchlist,
            Err(err) => {
                tracing::warn!(
                    event = "persistence_unavailable",
                    error = %err,
                    "error reading watchlist, starting empty"
                );
                Watchlist::new()
            }
        }
    }

    fn save_watchlist(&self, watchlist: &Watchlist) -> bool {
        match self.store.save(watchlist) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    event = "persistence_unavailable",
                    error = %err,
                    "error writing watchlist"
                );
                false
            }
        }
    }
}

/// Watchlist ids followed by freshly resolved ids, each id once
pub fn candidate_ids(watchlist: &Watchlist, polls: &[FeedPoll]) -> Vec<VideoId> {
    let mut seen = HashSet::new();
    watchlist
        .iter()
        .chain(polls.iter().filter_map(|poll| poll.latest.as_ref()))
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}
