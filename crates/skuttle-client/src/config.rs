//! Per-identity app configuration, persisted as JSON.
//!
//! All settings have defaults so a configuration only needs an identity.
//! A few can be overridden from the environment for local development.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use skuttle_shared::constants::{DEFAULT_MAX_AGE_MS, MIN_NUMBER_OF_STARS};
use skuttle_shared::{FeedId, Star};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

const DEFAULT_TOKEN_TIMEOUT_MS: u64 = 30_000;
const CONFIG_FILE: &str = "configurations.json";
const MILLIS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

/// Settings of one identity on this device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfiguration {
    /// Display name of the configuration, not of the identity.
    pub name: String,

    pub identity: Option<FeedId>,

    /// System relays this identity keeps invites for.
    /// Env: `SKUTTLE_STARS` (path to a stars file)
    pub stars: Vec<Star>,

    /// How many stars a mission tries to be connected to.
    /// Default: `3`
    pub minimum_stars: usize,

    /// Bearer-token endpoint.
    /// Env: `SKUTTLE_TOKEN_URL`
    /// Default: none (token requests fail with `Config`).
    pub token_url: Option<String>,

    /// Entries claimed older than this are not indexed.
    /// Env: `SKUTTLE_MAX_AGE_DAYS`
    /// Default: six months.
    pub max_age_ms: i64,

    /// How long a caller waits for the token worker to answer.
    pub token_timeout_ms: u64,

    /// Highest published-message count seen for this identity.
    pub number_of_published_messages: i64,
}

impl Default for AppConfiguration {
    fn default() -> Self {
        Self {
            name: "New configuration".to_string(),
            identity: None,
            stars: Vec::new(),
            minimum_stars: MIN_NUMBER_OF_STARS,
            token_url: None,
            max_age_ms: DEFAULT_MAX_AGE_MS,
            token_timeout_ms: DEFAULT_TOKEN_TIMEOUT_MS,
            number_of_published_messages: 0,
        }
    }
}

impl AppConfiguration {
    pub fn new(name: impl Into<String>, identity: FeedId) -> Self {
        Self {
            name: name.into(),
            identity: Some(identity),
            ..Self::default()
        }
    }

    /// Default configuration for `identity` with environment overrides.
    pub fn from_env(identity: FeedId) -> Self {
        let mut config = Self::new("Environment", identity);
        config.apply_env();
        config
    }

    /// Override fields from environment variables, keeping the current
    /// value when a variable is missing or invalid.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("SKUTTLE_TOKEN_URL") {
            if url.starts_with("http://") || url.starts_with("https://") {
                self.token_url = Some(url);
            } else {
                warn!(value = %url, "Invalid SKUTTLE_TOKEN_URL, ignoring");
            }
        }

        if let Ok(path) = std::env::var("SKUTTLE_STARS") {
            let stars = skuttle_net::load_stars(Path::new(&path));
            if stars.is_empty() {
                warn!(path = %path, "SKUTTLE_STARS has no valid invite, keeping configured stars");
            } else {
                self.stars = stars;
            }
        }

        if let Ok(days) = std::env::var("SKUTTLE_MAX_AGE_DAYS") {
            match days.parse::<i64>() {
                Ok(days) if days > 0 => self.max_age_ms = days * MILLIS_PER_DAY,
                _ => warn!(value = %days, "Invalid SKUTTLE_MAX_AGE_DAYS, using default"),
            }
        }
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_millis(self.token_timeout_ms)
    }

    /// Configured identity, or `NotLoggedIn` when there is none.
    pub fn require_identity(&self) -> Result<&FeedId> {
        self.identity.as_ref().ok_or(ClientError::NotLoggedIn)
    }
}

/// Every configuration on the device and which one is active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfigurations {
    pub configurations: Vec<AppConfiguration>,
    pub current: Option<FeedId>,
}

impl AppConfigurations {
    /// Read from `path`; a missing file yields an empty list.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configurations file yet");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write to `path` through a temporary file so readers never see a
    /// partial document.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn current(&self) -> Option<&AppConfiguration> {
        let current = self.current.as_ref()?;
        self.find(current)
    }

    pub fn find(&self, identity: &FeedId) -> Option<&AppConfiguration> {
        self.configurations
            .iter()
            .find(|c| c.identity.as_ref() == Some(identity))
    }

    fn find_mut(&mut self, identity: &FeedId) -> Option<&mut AppConfiguration> {
        self.configurations
            .iter_mut()
            .find(|c| c.identity.as_ref() == Some(identity))
    }

    /// Insert `config`, replacing the one for the same identity.
    pub fn upsert(&mut self, config: AppConfiguration) -> Result<()> {
        let identity = config.require_identity()?.clone();
        match self.find_mut(&identity) {
            Some(existing) => *existing = config,
            None => self.configurations.push(config),
        }
        Ok(())
    }

    pub fn select(&mut self, identity: &FeedId) -> Result<()> {
        if self.find(identity).is_none() {
            return Err(ClientError::Config(format!("no configuration for {identity}")));
        }
        self.current = Some(identity.clone());
        Ok(())
    }

    pub fn remove(&mut self, identity: &FeedId) {
        self.configurations
            .retain(|c| c.identity.as_ref() != Some(identity));
        if self.current.as_ref() == Some(identity) {
            self.current = None;
        }
    }
}

/// Shared, file-backed handle on [`AppConfigurations`].
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    inner: Mutex<AppConfigurations>,
}

impl ConfigStore {
    pub fn open(path: &Path) -> Result<Self> {
        let configurations = AppConfigurations::load(path)?;
        info!(
            path = %path.display(),
            count = configurations.configurations.len(),
            "Loaded app configurations"
        );
        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(configurations),
        })
    }

    /// Open `configurations.json` in the platform data directory.
    pub fn open_default() -> Result<Self> {
        let project_dirs = ProjectDirs::from("org", "skuttle", "skuttle")
            .ok_or_else(|| ClientError::Config("could not determine data directory".into()))?;
        Self::open(&project_dirs.data_dir().join(CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the active configuration.
    pub fn current(&self) -> Option<AppConfiguration> {
        self.lock().current().cloned()
    }

    pub fn snapshot(&self) -> AppConfigurations {
        self.lock().clone()
    }

    /// Mutate the configurations and persist them. Nothing is written when
    /// `f` fails.
    pub fn update<T>(&self, f: impl FnOnce(&mut AppConfigurations) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let out = f(&mut next)?;
        next.save(&self.path)?;
        *guard = next;
        Ok(out)
    }

    /// Persist `count` as the published-message count of `identity` if it
    /// is the active identity and `count` exceeds the stored value.
    pub fn record_published(&self, identity: &FeedId, count: i64) -> Result<bool> {
        let mut guard = self.lock();
        if guard.current.as_ref() != Some(identity) {
            return Ok(false);
        }
        let stored = guard
            .current()
            .map(|c| c.number_of_published_messages)
            .unwrap_or(0);
        if count <= stored {
            return Ok(false);
        }

        let mut next = guard.clone();
        if let Some(config) = next.find_mut(identity) {
            config.number_of_published_messages = count;
        }
        next.save(&self.path)?;
        *guard = next;
        debug!(identity = %identity, count, "Persisted published message count");
        Ok(true)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AppConfigurations> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::feed;

    fn store_with(identity: &FeedId) -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(&dir.path().join(CONFIG_FILE)).unwrap();
        store
            .update(|all| {
                all.upsert(AppConfiguration::new("test", identity.clone()))?;
                all.select(identity)
            })
            .unwrap();
        (dir, store)
    }

    #[test]
    fn test_defaults() {
        let config = AppConfiguration::default();
        assert_eq!(config.minimum_stars, 3);
        assert_eq!(config.max_age_ms, DEFAULT_MAX_AGE_MS);
        assert!(matches!(config.require_identity(), Err(ClientError::NotLoggedIn)));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppConfigurations::load(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.configurations.is_empty());
        assert!(loaded.current().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let me = feed(1);
        let (dir, store) = store_with(&me);

        let reopened = ConfigStore::open(&dir.path().join(CONFIG_FILE)).unwrap();
        let current = reopened.current().unwrap();
        assert_eq!(current.identity, Some(me));
        assert_eq!(current.name, "test");
        assert_eq!(reopened.snapshot(), store.snapshot());
    }

    #[test]
    fn test_select_unknown_identity_fails() {
        let (_dir, store) = store_with(&feed(1));
        let result = store.update(|all| all.select(&feed(2)));
        assert!(matches!(result, Err(ClientError::Config(_))));
        assert_eq!(store.current().unwrap().identity, Some(feed(1)));
    }

    #[test]
    fn test_published_count_only_grows() {
        let me = feed(1);
        let (dir, store) = store_with(&me);

        assert!(store.record_published(&me, 10).unwrap());
        assert!(!store.record_published(&me, 7).unwrap());
        assert!(!store.record_published(&me, 10).unwrap());
        assert_eq!(store.current().unwrap().number_of_published_messages, 10);

        let reopened = ConfigStore::open(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(reopened.current().unwrap().number_of_published_messages, 10);
    }

    #[test]
    fn test_published_count_ignores_other_identities() {
        let me = feed(1);
        let (_dir, store) = store_with(&me);
        store
            .update(|all| all.upsert(AppConfiguration::new("other", feed(2))))
            .unwrap();

        assert!(!store.record_published(&feed(2), 50).unwrap());
        let other = store.snapshot().find(&feed(2)).cloned().unwrap();
        assert_eq!(other.number_of_published_messages, 0);
    }
}
