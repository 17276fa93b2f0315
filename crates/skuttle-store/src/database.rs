//! View database connection management.
//!
//! [`ViewDatabase`] owns two connections to the same WAL-mode file: a writer
//! used only by the indexer and a read-only connection used by queries, so
//! feed reads proceed while an indexing transaction is open.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{Connection, OpenFlags, Transaction};
use skuttle_shared::FeedId;

use crate::error::{Result, StoreError};
use crate::ids;
use crate::migrations;

pub struct ViewDatabase {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
    identity: FeedId,
    self_id: i64,
    max_age_ms: i64,
}

impl ViewDatabase {
    /// Open (or create) the view for `identity` in the platform data directory.
    ///
    /// - Linux:   `~/.local/share/skuttle/views/<identity>/view.sqlite`
    /// - macOS:   `~/Library/Application Support/org.skuttle.skuttle/views/...`
    pub fn open_default(identity: &FeedId, max_age_ms: i64) -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("org", "skuttle", "skuttle").ok_or(StoreError::NoDataDir)?;

        let dir = project_dirs
            .data_dir()
            .join("views")
            .join(identity.encoded().replace(|c: char| matches!(c, '/' | '+' | '='), "_"));
        std::fs::create_dir_all(&dir)?;

        Self::open(&dir.join("view.sqlite"), identity, max_age_ms)
    }

    /// Open (or create) the view at an explicit path.
    ///
    /// Entries claiming a timestamp older than `max_age_ms` are not indexed.
    pub fn open(path: &Path, identity: &FeedId, max_age_ms: i64) -> Result<Self> {
        tracing::info!(path = %path.display(), identity = %identity, "opening view database");

        let writer = Connection::open(path)?;
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.pragma_update(None, "synchronous", "NORMAL")?;

        migrations::run_migrations(&writer)?;

        let self_id = ids::author_id(&writer, identity.as_str(), true)?;

        let reader = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            path: path.to_path_buf(),
            identity: identity.clone(),
            self_id,
            max_age_ms,
        })
    }

    /// Identity that owns this view.
    pub fn identity(&self) -> &FeedId {
        &self.identity
    }

    pub(crate) fn self_id(&self) -> i64 {
        self.self_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_age_ms(&self) -> i64 {
        self.max_age_ms
    }

    /// Claimed timestamps below this are outside the retention window.
    pub fn cutoff_ms(&self) -> i64 {
        now_ms() - self.max_age_ms
    }

    /// Run `f` inside a write transaction on the single writer connection.
    ///
    /// The transaction commits only when `f` returns `Ok`.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Run `f` on the read connection.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }

    pub fn schema_version(&self) -> Result<u32> {
        self.read(migrations::schema_version)
    }
}

/// Local clock in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
