//! Fixtures shared by the store tests.

use std::sync::atomic::{AtomicU64, Ordering};

use skuttle_shared::constants::DEFAULT_MAX_AGE_MS;
use skuttle_shared::content::Post;
use skuttle_shared::{Content, FeedId, Message, MessageId};
use tempfile::TempDir;

use crate::database::{now_ms, ViewDatabase};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

pub(crate) struct TestView {
    _dir: TempDir,
    pub db: ViewDatabase,
    pub me: FeedId,
}

pub(crate) fn open_view() -> TestView {
    let dir = tempfile::tempdir().unwrap();
    let me = feed(1);
    let db = ViewDatabase::open(&dir.path().join("view.sqlite"), &me, DEFAULT_MAX_AGE_MS).unwrap();
    TestView { _dir: dir, db, me }
}

pub(crate) fn feed(n: u8) -> FeedId {
    FeedId::from_bytes(&[n; 32])
}

pub(crate) fn minutes_ago(minutes: i64) -> i64 {
    now_ms() - minutes * 60 * 1000
}

fn next_key() -> MessageId {
    let n = NEXT_KEY.fetch_add(1, Ordering::Relaxed);
    let mut bytes = [0xAB; 32];
    bytes[..8].copy_from_slice(&n.to_le_bytes());
    MessageId::from_bytes(&bytes)
}

/// Appends correctly chained entries to one feed.
pub(crate) struct FeedWriter {
    pub author: FeedId,
    sequence: i64,
    previous: Option<MessageId>,
}

impl FeedWriter {
    pub fn new(author: FeedId) -> Self {
        Self {
            author,
            sequence: 0,
            previous: None,
        }
    }

    pub fn append(&mut self, content: Content, claimed_at: i64) -> Message {
        self.sequence += 1;
        let key = next_key();
        Message {
            key: key.clone(),
            author: self.author.clone(),
            sequence: self.sequence,
            previous: self.previous.replace(key),
            signature: "sig.ed25519".into(),
            claimed_at,
            received_at: now_ms(),
            received_seq: None,
            is_private: false,
            content,
        }
    }

    pub fn post(&mut self, text: &str, claimed_at: i64) -> Message {
        self.append(Content::Post(Post::new(text)), claimed_at)
    }
}
