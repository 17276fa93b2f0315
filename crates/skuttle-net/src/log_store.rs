//! Contract of the replicating log store the client drives.
//!
//! The store owns the signed feeds, gossips them with peers and hands newly
//! replicated entries to the view indexer in receive order. Everything above
//! it (missions, refresh, statistics) talks to it only through [`LogStore`].

use std::future::Future;

use serde::{Deserialize, Serialize};
use skuttle_shared::{Content, FeedId, Message, MessageId, MultiserverAddress, PubAnnouncement, Star};

use crate::error::Result;

/// Counters reported by the log store about its own repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStatus {
    /// Number of feeds the store replicates.
    pub feed_count: u64,
    /// Total entries across every feed.
    pub message_count: u64,
    /// Entries authored by the logged in identity.
    pub published_count: u64,
    /// Key of the newest local entry, if any.
    pub last_hash: Option<MessageId>,
}

pub trait LogStore: Send + Sync + 'static {
    /// Identity the store is logged in as.
    fn identity(&self) -> Option<FeedId>;

    fn connect(&self, peer: &MultiserverAddress) -> impl Future<Output = Result<()>> + Send;

    fn disconnect(&self, peer: &MultiserverAddress) -> impl Future<Output = Result<()>> + Send;

    /// Entries received after `after_rx_seq`, ascending by receive sequence
    /// (and therefore by per-feed sequence), at most `limit` of them.
    fn replicated_since(&self, after_rx_seq: i64, limit: u32) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// Append `content` to the logged in feed.
    fn publish(&self, content: Content) -> impl Future<Output = Result<MessageId>> + Send;

    fn redeem_invitation(&self, star: &Star) -> impl Future<Output = Result<()>> + Send;

    /// Make the store aware of relay addresses before it looks up pubs.
    fn seed_pub_addresses(&self, addresses: &[MultiserverAddress]) -> impl Future<Output = Result<()>> + Send;

    /// Pub announcements the store has replicated so far.
    fn pubs(&self) -> impl Future<Output = Result<Vec<PubAnnouncement>>> + Send;

    /// Every peer the store knows an address for.
    fn known_peers(&self) -> impl Future<Output = Result<Vec<MultiserverAddress>>> + Send;

    /// Peers with an open gossip connection right now.
    fn open_connections(&self) -> impl Future<Output = Result<Vec<MultiserverAddress>>> + Send;

    fn repo_status(&self) -> impl Future<Output = Result<RepoStatus>> + Send;
}
