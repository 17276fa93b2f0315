//! Rows returned by view queries.
//!
//! Every struct derives `Serialize` so it can be handed straight to a UI
//! layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use skuttle_shared::content::Dimensions;
use skuttle_shared::{BlobId, ContactState, FeedId, MessageId, MultiserverAddress};

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Latest profile fields known for an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AboutRow {
    pub about: FeedId,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Blob reference of the avatar.
    pub image: Option<String>,
    pub public_web_hosting: Option<bool>,
}

// ---------------------------------------------------------------------------
// Feed entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replier {
    pub identity: FeedId,
    pub about: Option<AboutRow>,
}

/// Thread activity under a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplySummary {
    /// Posts and votes pointing at the thread root.
    pub count: i64,
    /// Up to three distinct repliers.
    pub repliers: Vec<Replier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobRow {
    pub identifier: BlobId,
    pub name: Option<String>,
    pub size: Option<i64>,
    pub dimensions: Option<Dimensions>,
    pub mime_type: Option<String>,
    pub average_color_rgb: Option<i64>,
}

/// A post enriched for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub key: MessageId,
    pub author: FeedId,
    pub sequence: i64,
    pub claimed_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub text: String,
    pub is_root: bool,
    pub root: Option<MessageId>,
    pub is_private: bool,
    pub about: Option<AboutRow>,
    pub replies: ReplySummary,
    pub blobs: Vec<BlobRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteEntry {
    pub key: MessageId,
    pub author: FeedId,
    pub claimed_at: DateTime<Utc>,
    pub link: MessageId,
    pub value: i64,
    pub expression: Option<String>,
}

/// One element of a thread, ordered by claimed time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ThreadItem {
    Post(FeedEntry),
    Vote(VoteEntry),
}

impl ThreadItem {
    pub fn key(&self) -> &MessageId {
        match self {
            ThreadItem::Post(post) => &post.key,
            ThreadItem::Vote(vote) => &vote.key,
        }
    }

    pub fn claimed_at(&self) -> DateTime<Utc> {
        match self {
            ThreadItem::Post(post) => post.claimed_at,
            ThreadItem::Vote(vote) => vote.claimed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Graph, relays, hashtags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub from_state: ContactState,
    pub to_state: ContactState,
}

/// Relay address learned from a `pub` announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownPub {
    pub identity: FeedId,
    pub address: MultiserverAddress,
    pub announced_by: FeedId,
    pub worked_last: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hashtag {
    pub name: String,
    pub count: i64,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub authors: i64,
    pub messages: i64,
    pub posts: i64,
    pub votes: i64,
    pub contacts: i64,
    pub abouts: i64,
    pub hashtags: i64,
    pub addresses: i64,
}

pub(crate) fn millis_to_date(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
