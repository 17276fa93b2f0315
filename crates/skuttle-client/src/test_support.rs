//! Fakes shared by the client tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use skuttle_net::{LogStore, NetError, RepoStatus};
use skuttle_shared::constants::DEFAULT_MAX_AGE_MS;
use skuttle_shared::content::Post;
use skuttle_shared::{Content, FeedId, Message, MessageId, MultiserverAddress, PubAnnouncement, Star};
use skuttle_store::ViewDatabase;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfiguration, ConfigStore};
use crate::telemetry::Telemetry;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

pub(crate) fn feed(n: u8) -> FeedId {
    FeedId::from_bytes(&[n; 32])
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Invite for a star whose key is `[n; 32]`.
pub(crate) fn star(n: u8) -> Star {
    let key = feed(n);
    format!("relay{n}.example.org:8008:@{}.ed25519~c2VlZA==", key.encoded())
        .parse()
        .unwrap()
}

pub(crate) fn post(author: &FeedId, sequence: i64, text: &str) -> Message {
    let n = NEXT_KEY.fetch_add(1, Ordering::Relaxed);
    let mut bytes = [0xCD; 32];
    bytes[..8].copy_from_slice(&n.to_le_bytes());
    Message {
        key: MessageId::from_bytes(&bytes),
        author: author.clone(),
        sequence,
        previous: None,
        signature: "sig.ed25519".into(),
        claimed_at: now_ms() - 60_000,
        received_at: now_ms(),
        received_seq: None,
        is_private: false,
        content: Content::Post(Post::new(text)),
    }
}

/// Everything a component needs, rooted in one temp dir.
pub(crate) struct Harness {
    _dir: TempDir,
    pub me: FeedId,
    pub store: Arc<FakeLogStore>,
    pub view: Arc<ViewDatabase>,
    pub config: Arc<ConfigStore>,
    pub telemetry: Arc<RecordingTelemetry>,
}

impl Harness {
    pub fn new(stars: Vec<Star>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let me = feed(1);
        let view = ViewDatabase::open(&dir.path().join("view.sqlite"), &me, DEFAULT_MAX_AGE_MS).unwrap();
        let config = ConfigStore::open(&dir.path().join("configurations.json")).unwrap();
        config
            .update(|all| {
                let mut current = AppConfiguration::new("test", me.clone());
                current.stars = stars;
                all.upsert(current)?;
                all.select(&me)
            })
            .unwrap();

        let store = FakeLogStore::default();
        *store.identity.lock().unwrap() = Some(me.clone());

        Self {
            _dir: dir,
            me,
            store: Arc::new(store),
            view: Arc::new(view),
            config: Arc::new(config),
            telemetry: Arc::new(RecordingTelemetry::default()),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingTelemetry {
    pub reports: Mutex<Vec<String>>,
}

impl Telemetry for RecordingTelemetry {
    fn report(&self, context: &str, error: &(dyn std::error::Error + 'static)) {
        self.reports.lock().unwrap().push(format!("{context}: {error}"));
    }
}

/// In-memory log store whose peers and invites succeed or fail on demand.
#[derive(Debug, Default)]
pub(crate) struct FakeLogStore {
    pub identity: Mutex<Option<FeedId>>,
    pub log: Mutex<Vec<Message>>,
    pub pubs: Mutex<Vec<PubAnnouncement>>,
    pub unreachable: Mutex<HashSet<MultiserverAddress>>,
    pub failing_invites: Mutex<HashSet<FeedId>>,
    pub connect_attempts: Mutex<Vec<MultiserverAddress>>,
    pub open: Mutex<Vec<MultiserverAddress>>,
    pub known: Mutex<Vec<MultiserverAddress>>,
    pub seeded: Mutex<Vec<MultiserverAddress>>,
    pub redeemed: Mutex<Vec<Star>>,
    pub published: Mutex<Vec<Content>>,
    /// Content type names whose publication fails.
    pub failing_publishes: Mutex<HashSet<&'static str>>,
    /// Cancelled once an invite has been redeemed.
    pub cancel_on_redeem: Mutex<Option<CancellationToken>>,
    pub repo: Mutex<RepoStatus>,
}

impl FakeLogStore {
    /// Append to the receive log, numbering from 0.
    pub fn receive(&self, mut message: Message) {
        let mut log = self.log.lock().unwrap();
        message.received_seq = Some(log.len() as i64);
        log.push(message);
    }

    pub fn announce(&self, star: &Star) {
        self.pubs.lock().unwrap().push(star.to_pub());
    }

    pub fn attempts(&self) -> Vec<MultiserverAddress> {
        self.connect_attempts.lock().unwrap().clone()
    }
}

impl LogStore for FakeLogStore {
    fn identity(&self) -> Option<FeedId> {
        self.identity.lock().unwrap().clone()
    }

    async fn connect(&self, peer: &MultiserverAddress) -> skuttle_net::Result<()> {
        self.connect_attempts.lock().unwrap().push(peer.clone());
        if self.unreachable.lock().unwrap().contains(peer) {
            return Err(NetError::Network(format!("{peer} unreachable")));
        }
        let mut open = self.open.lock().unwrap();
        if !open.contains(peer) {
            open.push(peer.clone());
        }
        Ok(())
    }

    async fn disconnect(&self, peer: &MultiserverAddress) -> skuttle_net::Result<()> {
        self.open.lock().unwrap().retain(|p| p != peer);
        Ok(())
    }

    async fn replicated_since(&self, after_rx_seq: i64, limit: u32) -> skuttle_net::Result<Vec<Message>> {
        Ok(self
            .log
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.received_seq.unwrap_or(-1) > after_rx_seq)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn publish(&self, content: Content) -> skuttle_net::Result<MessageId> {
        if self.failing_publishes.lock().unwrap().contains(content.type_name()) {
            return Err(NetError::Network(format!("cannot publish {}", content.type_name())));
        }
        let mut published = self.published.lock().unwrap();
        published.push(content);
        Ok(MessageId::from_bytes(&[published.len() as u8; 32]))
    }

    async fn redeem_invitation(&self, star: &Star) -> skuttle_net::Result<()> {
        if self.failing_invites.lock().unwrap().contains(&star.feed) {
            return Err(NetError::Network("invite rejected".into()));
        }
        self.redeemed.lock().unwrap().push(star.clone());
        if let Some(cancel) = self.cancel_on_redeem.lock().unwrap().as_ref() {
            cancel.cancel();
        }
        Ok(())
    }

    async fn seed_pub_addresses(&self, addresses: &[MultiserverAddress]) -> skuttle_net::Result<()> {
        self.seeded.lock().unwrap().extend_from_slice(addresses);
        Ok(())
    }

    async fn pubs(&self) -> skuttle_net::Result<Vec<PubAnnouncement>> {
        Ok(self.pubs.lock().unwrap().clone())
    }

    async fn known_peers(&self) -> skuttle_net::Result<Vec<MultiserverAddress>> {
        Ok(self.known.lock().unwrap().clone())
    }

    async fn open_connections(&self) -> skuttle_net::Result<Vec<MultiserverAddress>> {
        Ok(self.open.lock().unwrap().clone())
    }

    async fn repo_status(&self) -> skuttle_net::Result<RepoStatus> {
        Ok(self.repo.lock().unwrap().clone())
    }
}
