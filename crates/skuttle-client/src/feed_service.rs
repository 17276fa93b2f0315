//! Async front of the view queries.
//!
//! Every call runs on tokio's blocking pool, so UI-facing tasks awaiting
//! it never block on SQLite.

use std::sync::Arc;

use skuttle_shared::{FeedId, MessageId};
use skuttle_store::feed::{Discover, GlobalPosts, HashtagPosts};
use skuttle_store::{AboutRow, FeedEntry, FeedStrategy, Hashtag, KnownPub, Relationship, ThreadItem, ViewDatabase};

use crate::error::Result;

#[derive(Clone)]
pub struct FeedService {
    view: Arc<ViewDatabase>,
}

impl FeedService {
    pub fn new(view: Arc<ViewDatabase>) -> Self {
        Self { view }
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ViewDatabase) -> skuttle_store::Result<T> + Send + 'static,
    {
        let view = self.view.clone();
        Ok(tokio::task::spawn_blocking(move || f(&view)).await??)
    }

    /// Page of any strategy.
    pub async fn feed(&self, strategy: Arc<dyn FeedStrategy>, limit: u32, offset: u32) -> Result<Vec<FeedEntry>> {
        self.run(move |view| view.feed(strategy.as_ref(), limit, offset)).await
    }

    pub async fn recent_posts(
        &self,
        limit: u32,
        offset: Option<u32>,
        want_private: bool,
        only_followed: bool,
    ) -> Result<Vec<FeedEntry>> {
        self.run(move |view| view.recent_posts(limit, offset, want_private, only_followed))
            .await
    }

    pub async fn global(&self, limit: u32, offset: u32) -> Result<Vec<FeedEntry>> {
        self.feed(Arc::new(GlobalPosts), limit, offset).await
    }

    pub async fn discover(&self, limit: u32) -> Result<Vec<FeedEntry>> {
        self.feed(Arc::new(Discover), limit, 0).await
    }

    pub async fn hashtag(&self, tag: &str, limit: u32, offset: u32) -> Result<Vec<FeedEntry>> {
        self.feed(Arc::new(HashtagPosts::new(tag)), limit, offset).await
    }

    pub async fn profile(&self, identity: &FeedId, limit: u32, offset: u32) -> Result<Vec<FeedEntry>> {
        let identity = identity.clone();
        self.run(move |view| view.feed_for(&identity, limit, offset)).await
    }

    pub async fn thread(&self, root: &MessageId) -> Result<Vec<ThreadItem>> {
        let root = root.clone();
        self.run(move |view| view.replies_to(&root)).await
    }

    pub async fn post(&self, key: &MessageId) -> Result<FeedEntry> {
        let key = key.clone();
        self.run(move |view| view.post(&key)).await
    }

    pub async fn mentions(&self, limit: u32) -> Result<Vec<FeedEntry>> {
        self.run(move |view| view.mentions(limit)).await
    }

    pub async fn about(&self, identity: &FeedId) -> Result<Option<AboutRow>> {
        let identity = identity.clone();
        self.run(move |view| view.about(&identity)).await
    }

    pub async fn relationship(&self, a: &FeedId, b: &FeedId) -> Result<Relationship> {
        let (a, b) = (a.clone(), b.clone());
        self.run(move |view| view.relationship(&a, &b)).await
    }

    pub async fn hashtags(&self) -> Result<Vec<Hashtag>> {
        self.run(|view| view.hashtags()).await
    }

    pub async fn known_pubs(&self) -> Result<Vec<KnownPub>> {
        self.run(|view| view.known_pubs()).await
    }
}
