//! Point-in-time statistics of the log store, the view and the peers.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use skuttle_net::{LogStore, PeerTracker};
use skuttle_shared::{FeedId, MessageId, MultiserverAddress};
use skuttle_store::ViewDatabase;
use tracing::{debug, warn};

use crate::activity::Activity;
use crate::config::ConfigStore;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStatistics {
    pub feed_count: u64,
    pub message_count: u64,
    /// Own entries present in the view, `-1` when unreadable.
    pub published_count: i64,
    pub last_hash: Option<MessageId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerStatistics {
    /// Peers the log store has an address for.
    pub known: usize,
    pub connected: usize,
    pub open: Vec<MultiserverAddress>,
    /// Connections opened since the previous snapshot.
    pub opened: Vec<MultiserverAddress>,
    /// Connections closed since the previous snapshot.
    pub closed: Vec<MultiserverAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotStatistics {
    pub repo: RepoStatistics,
    pub peers: PeerStatistics,
    /// Receive-log position the view has consumed, `-1` for none or
    /// when unreadable.
    pub last_received_seq: i64,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_refresh_duration: Option<Duration>,
}

pub struct StatisticsCollector<L: LogStore> {
    store: Arc<L>,
    view: Arc<ViewDatabase>,
    config: Arc<ConfigStore>,
    activity: Arc<Activity>,
    tracker: Mutex<PeerTracker>,
}

impl<L: LogStore> StatisticsCollector<L> {
    pub fn new(store: Arc<L>, view: Arc<ViewDatabase>, config: Arc<ConfigStore>, activity: Arc<Activity>) -> Self {
        Self {
            store,
            view,
            config,
            activity,
            tracker: Mutex::new(PeerTracker::new()),
        }
    }

    /// Collect a snapshot.
    ///
    /// Side effect: when the view holds more own entries than the active
    /// configuration has on record, the new count is persisted. A lower or
    /// equal count never overwrites it.
    pub async fn snapshot(&self) -> Result<BotStatistics> {
        let identity: FeedId = self.view.identity().clone();

        let view = self.view.clone();
        let own = identity.clone();
        let (last_received_seq, published_count) = tokio::task::spawn_blocking(move || {
            (
                or_unknown(view.last_received_seq(), "last received sequence"),
                or_unknown(view.published_count(&own), "published count"),
            )
        })
        .await?;

        let status = self.store.repo_status().await?;
        let known = self.store.known_peers().await?.len();
        let open = self.store.open_connections().await?;

        let diff = self
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(&open);
        if !diff.is_empty() {
            debug!(opened = diff.opened.len(), closed = diff.closed.len(), "Peer connections changed");
        }

        let config = self.config.clone();
        let persisted = tokio::task::spawn_blocking(move || config.record_published(&identity, published_count)).await?;
        if let Err(e) = persisted {
            warn!(error = %e, "Failed to persist published message count");
        }

        let activity = self.activity.snapshot();
        Ok(BotStatistics {
            repo: RepoStatistics {
                feed_count: status.feed_count,
                message_count: status.message_count,
                published_count,
                last_hash: status.last_hash,
            },
            peers: PeerStatistics {
                known,
                connected: open.len(),
                open,
                opened: diff.opened,
                closed: diff.closed,
            },
            last_received_seq,
            last_sync: activity.last_sync,
            last_refresh: activity.last_refresh,
            last_refresh_duration: activity.last_refresh_duration,
        })
    }
}

/// View counters degrade to `-1` instead of failing the snapshot.
fn or_unknown(result: skuttle_store::Result<i64>, counter: &str) -> i64 {
    result.unwrap_or_else(|e| {
        warn!(counter, error = %e, "Failed to read view counter");
        -1
    })
}
