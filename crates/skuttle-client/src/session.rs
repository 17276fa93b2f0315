//! Wiring of one logged in identity.
//!
//! A [`Session`] owns the handles every component needs (log store, view,
//! configuration, telemetry) and hands them out explicitly; nothing in the
//! client reaches for global state.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use skuttle_net::LogStore;
use skuttle_store::ViewDatabase;
use tracing::info;

use crate::activity::Activity;
use crate::config::{AppConfiguration, ConfigStore};
use crate::error::{ClientError, Result};
use crate::feed_service::FeedService;
use crate::mission::SyncOrchestrator;
use crate::refresh::Refresher;
use crate::statistics::StatisticsCollector;
use crate::telemetry::Telemetry;
use crate::token::{HttpTokenFetcher, TokenCache};

/// Active configuration, provided the log store is logged in as its
/// identity.
pub fn logged_in<L: LogStore + ?Sized>(store: &L, config: &ConfigStore) -> Result<AppConfiguration> {
    let current = config.current().ok_or(ClientError::NotLoggedIn)?;
    match (store.identity(), current.identity.as_ref()) {
        (Some(logged), Some(configured)) if &logged == configured => Ok(current),
        _ => Err(ClientError::NotLoggedIn),
    }
}

pub struct Session<L: LogStore> {
    store: Arc<L>,
    view: Arc<ViewDatabase>,
    config: Arc<ConfigStore>,
    telemetry: Arc<dyn Telemetry>,
    activity: Arc<Activity>,
}

impl<L: LogStore> Session<L> {
    /// Open the view of the active configuration in the platform data dir.
    pub fn open(store: Arc<L>, config: Arc<ConfigStore>, telemetry: Arc<dyn Telemetry>) -> anyhow::Result<Self> {
        let current = logged_in(store.as_ref(), &config).context("cannot open session")?;
        let identity = current.require_identity()?;
        let view = ViewDatabase::open_default(identity, current.max_age_ms)
            .with_context(|| format!("failed to open view for {identity}"))?;
        Ok(Self::with_view(store, Arc::new(view), config, telemetry))
    }

    /// Open the view of the active configuration at `path`.
    pub fn open_at(
        path: &Path,
        store: Arc<L>,
        config: Arc<ConfigStore>,
        telemetry: Arc<dyn Telemetry>,
    ) -> anyhow::Result<Self> {
        let current = logged_in(store.as_ref(), &config).context("cannot open session")?;
        let identity = current.require_identity()?;
        let view = ViewDatabase::open(path, identity, current.max_age_ms)
            .with_context(|| format!("failed to open view at {}", path.display()))?;
        Ok(Self::with_view(store, Arc::new(view), config, telemetry))
    }

    pub fn with_view(
        store: Arc<L>,
        view: Arc<ViewDatabase>,
        config: Arc<ConfigStore>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        info!(identity = %view.identity(), "Session opened");
        Self {
            store,
            view,
            config,
            telemetry,
            activity: Arc::new(Activity::new()),
        }
    }

    pub fn store(&self) -> &Arc<L> {
        &self.store
    }

    pub fn view(&self) -> &Arc<ViewDatabase> {
        &self.view
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn ensure_logged_in(&self) -> Result<AppConfiguration> {
        logged_in(self.store.as_ref(), &self.config)
    }

    pub fn orchestrator(&self) -> SyncOrchestrator<L> {
        SyncOrchestrator::new(
            self.store.clone(),
            self.view.clone(),
            self.config.clone(),
            self.telemetry.clone(),
            self.activity.clone(),
        )
    }

    pub fn refresher(&self) -> Refresher<L> {
        Refresher::new(
            self.store.clone(),
            self.view.clone(),
            self.telemetry.clone(),
            self.activity.clone(),
        )
    }

    pub fn statistics(&self) -> StatisticsCollector<L> {
        StatisticsCollector::new(
            self.store.clone(),
            self.view.clone(),
            self.config.clone(),
            self.activity.clone(),
        )
    }

    pub fn feeds(&self) -> FeedService {
        FeedService::new(self.view.clone())
    }

    /// Token cache against the configured endpoint. Must be called from
    /// within a tokio runtime.
    pub fn token_cache(&self) -> Result<TokenCache> {
        let current = self.ensure_logged_in()?;
        let url = current
            .token_url
            .clone()
            .ok_or_else(|| ClientError::Config("no token endpoint configured".into()))?;
        Ok(TokenCache::spawn(
            HttpTokenFetcher::new(url),
            current.token_timeout(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{feed, Harness};

    #[test]
    fn test_logged_in_requires_matching_identity() {
        let h = Harness::new(Vec::new());
        assert_eq!(logged_in(h.store.as_ref(), &h.config).unwrap().identity, Some(h.me.clone()));

        *h.store.identity.lock().unwrap() = Some(feed(2));
        assert!(matches!(logged_in(h.store.as_ref(), &h.config), Err(ClientError::NotLoggedIn)));

        *h.store.identity.lock().unwrap() = None;
        assert!(matches!(logged_in(h.store.as_ref(), &h.config), Err(ClientError::NotLoggedIn)));
    }

    #[test]
    fn test_open_at_refuses_foreign_login() {
        let h = Harness::new(Vec::new());
        *h.store.identity.lock().unwrap() = Some(feed(2));
        let dir = tempfile::tempdir().unwrap();

        let result = Session::open_at(
            &dir.path().join("view.sqlite"),
            h.store.clone(),
            h.config.clone(),
            h.telemetry.clone(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_token_cache_needs_endpoint() {
        let h = Harness::new(Vec::new());
        let session = Session::with_view(h.store.clone(), h.view.clone(), h.config.clone(), h.telemetry.clone());
        assert!(matches!(session.token_cache(), Err(ClientError::Config(_))));
    }
}
