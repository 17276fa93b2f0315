//! Missions: keep the identity connected to enough system relays, then sync.

pub mod graph;
pub mod orchestrator;
pub mod plan;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use graph::{TaskGraph, TaskId, TaskOutcome};
pub use orchestrator::{MissionReport, SyncOrchestrator};
pub use plan::{plan_mission, MissionTask};

/// How hard the final sync step tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncQuality {
    /// One peer, one attempt. Background and notification checks.
    Low,
    /// Every candidate peer, retried with backoff. User initiated refresh.
    High,
}

/// Connection attempts derived from a [`SyncQuality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on peers dialed; `None` dials all candidates.
    pub max_peers: Option<usize>,
    pub attempts: u32,
    /// Delay before the second attempt, doubled for each later one.
    pub backoff: Duration,
}

impl SyncQuality {
    pub fn policy(self) -> RetryPolicy {
        match self {
            SyncQuality::Low => RetryPolicy {
                max_peers: Some(1),
                attempts: 1,
                backoff: Duration::ZERO,
            },
            SyncQuality::High => RetryPolicy {
                max_peers: None,
                attempts: 3,
                backoff: Duration::from_millis(50),
            },
        }
    }
}
