//! Pump from the log store's receive log into the view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use skuttle_net::LogStore;
use skuttle_shared::Message;
use skuttle_store::{StoreError, UnknownContent, ViewDatabase};
use tracing::{debug, info, warn};

use crate::activity::Activity;
use crate::error::Result;
use crate::telemetry::Telemetry;

/// Upper bound on entries pulled by one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshLoad {
    Tiny,
    Short,
    Medium,
    Long,
}

impl RefreshLoad {
    pub fn limit(self) -> u32 {
        match self {
            RefreshLoad::Tiny => 500,
            RefreshLoad::Short => 15_000,
            RefreshLoad::Medium => 45_000,
            RefreshLoad::Long => 100_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Entries pulled from the log store.
    pub fetched: usize,
    /// Entries projected into the view.
    pub indexed: usize,
    pub took: Duration,
    /// Another refresh was already running; nothing was done.
    pub skipped: bool,
}

pub struct Refresher<L: LogStore> {
    store: Arc<L>,
    view: Arc<ViewDatabase>,
    telemetry: Arc<dyn Telemetry>,
    activity: Arc<Activity>,
    refreshing: AtomicBool,
}

struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<L: LogStore> Refresher<L> {
    pub fn new(store: Arc<L>, view: Arc<ViewDatabase>, telemetry: Arc<dyn Telemetry>, activity: Arc<Activity>) -> Self {
        Self {
            store,
            view,
            telemetry,
            activity,
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Index up to `load` entries received since the last refresh.
    ///
    /// Only one refresh runs at a time; a call made while another is in
    /// flight returns immediately with `skipped` set.
    pub async fn refresh(&self, load: RefreshLoad) -> Result<RefreshReport> {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            debug!("Refresh already running");
            return Ok(RefreshReport {
                skipped: true,
                ..RefreshReport::default()
            });
        }
        let _guard = RefreshGuard(&self.refreshing);
        let started = Instant::now();

        let view = self.view.clone();
        let after = tokio::task::spawn_blocking(move || view.last_received_seq()).await??;
        let batch = self.store.replicated_since(after, load.limit()).await?;
        let fetched = batch.len();

        let indexed = if batch.is_empty() { 0 } else { self.index(batch).await? };

        let took = started.elapsed();
        self.activity.record_refresh(took);
        info!(
            load = ?load,
            after,
            fetched,
            indexed,
            took_ms = took.as_millis() as u64,
            "Refresh finished"
        );

        Ok(RefreshReport {
            fetched,
            indexed,
            took,
            skipped: false,
        })
    }

    /// Index `batch`; unknown content is reported, then the batch is
    /// indexed again with those entries recorded but not projected, so the
    /// pump does not stall on them.
    async fn index(&self, batch: Vec<Message>) -> Result<usize> {
        let view = self.view.clone();
        let (result, batch) = tokio::task::spawn_blocking(move || {
            let result = view.index(&batch);
            (result, batch)
        })
        .await?;

        match result {
            Err(e @ StoreError::UnexpectedContentType { .. }) => {
                warn!(error = %e, "Batch has unknown content, indexing without it");
                self.telemetry.report("refresh.index", &e);
                let view = self.view.clone();
                let indexed =
                    tokio::task::spawn_blocking(move || view.index_with(&batch, UnknownContent::Skip)).await??;
                Ok(indexed)
            }
            Err(e) => {
                self.telemetry.report("refresh.index", &e);
                Err(e.into())
            }
            Ok(indexed) => Ok(indexed),
        }
    }
}
