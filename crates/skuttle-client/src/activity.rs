//! Timestamps of the last sync and refresh, shared by the components that
//! perform them and the statistics collector that reports them.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub last_sync: Option<DateTime<Utc>>,
    /// Peers connected by the last successful sync.
    pub last_sync_peers: usize,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_refresh_duration: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct Activity {
    inner: Mutex<ActivitySnapshot>,
}

impl Activity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sync(&self, peers: usize) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.last_sync = Some(Utc::now());
        inner.last_sync_peers = peers;
    }

    pub fn record_refresh(&self, took: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.last_refresh = Some(Utc::now());
        inner.last_refresh_duration = Some(took);
    }

    pub fn snapshot(&self) -> ActivitySnapshot {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
