//! Runs mission task graphs against the log store.

use std::sync::Arc;

use futures::future::join_all;
use rand::seq::SliceRandom;
use skuttle_net::LogStore;
use skuttle_shared::content::Contact;
use skuttle_shared::{Content, MultiserverAddress, Star};
use skuttle_store::{StoreError, ViewDatabase};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::graph::{TaskId, TaskOutcome};
use super::plan::{plan_mission, MissionTask};
use super::{RetryPolicy, SyncQuality};
use crate::activity::Activity;
use crate::config::ConfigStore;
use crate::error::{ClientError, Result};
use crate::session::logged_in;
use crate::telemetry::Telemetry;

/// Redemptions may run side by side; the sync step runs alone after them.
const DEFAULT_MAX_PARALLEL: usize = 4;

/// What a finished mission did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionReport {
    pub redeemed: usize,
    pub redeem_failures: usize,
    pub synced_peers: usize,
}

#[derive(Debug)]
enum TaskReport {
    Redeemed(Result<()>),
    Synced(Result<usize>),
}

pub struct SyncOrchestrator<L: LogStore> {
    store: Arc<L>,
    view: Arc<ViewDatabase>,
    config: Arc<ConfigStore>,
    telemetry: Arc<dyn Telemetry>,
    activity: Arc<Activity>,
    max_parallel: usize,
}

impl<L: LogStore> SyncOrchestrator<L> {
    pub fn new(
        store: Arc<L>,
        view: Arc<ViewDatabase>,
        config: Arc<ConfigStore>,
        telemetry: Arc<dyn Telemetry>,
        activity: Arc<Activity>,
    ) -> Self {
        Self {
            store,
            view,
            config,
            telemetry,
            activity,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// Run one mission to completion.
    pub async fn run(&self, quality: SyncQuality) -> Result<MissionReport> {
        self.run_until(quality, CancellationToken::new()).await
    }

    /// Run one mission, stopping at the next step boundary once `cancel`
    /// fires.
    ///
    /// Failed redemptions are reported and skipped; only a failed (or
    /// cancelled) sync step fails the mission.
    pub async fn run_until(&self, quality: SyncQuality, cancel: CancellationToken) -> Result<MissionReport> {
        let config = logged_in(self.store.as_ref(), &self.config)?;
        info!(quality = ?quality, stars = config.stars.len(), "Mission started");

        let addresses: Vec<MultiserverAddress> = config.stars.iter().map(Star::to_peer).collect();
        self.store.seed_pub_addresses(&addresses).await?;
        let pubs = self.store.pubs().await?;

        let graph = {
            let mut rng = rand::thread_rng();
            plan_mission(&config.stars, &pubs, config.minimum_stars, quality, &mut rng)
        };
        debug!(tasks = graph.len(), "Mission planned");

        let outcomes = graph
            .run(self.max_parallel, cancel, |id, task, cancel| self.execute(id, task, cancel))
            .await;

        let mut report = MissionReport::default();
        let mut synced = None;
        for outcome in outcomes {
            match outcome {
                TaskOutcome::Finished(TaskReport::Redeemed(Ok(()))) => report.redeemed += 1,
                TaskOutcome::Finished(TaskReport::Redeemed(Err(_))) => report.redeem_failures += 1,
                TaskOutcome::Finished(TaskReport::Synced(result)) => synced = Some(result),
                TaskOutcome::Cancelled => {}
            }
        }

        report.synced_peers = synced.unwrap_or(Err(ClientError::Cancelled))?;
        info!(
            redeemed = report.redeemed,
            failures = report.redeem_failures,
            peers = report.synced_peers,
            "Mission finished"
        );
        Ok(report)
    }

    async fn execute(&self, id: TaskId, task: MissionTask, cancel: CancellationToken) -> TaskReport {
        match task {
            MissionTask::RedeemInvite { star, follow } => {
                debug!(task = %id, feed = %star.feed, "Redeeming invite");
                let result = self.redeem(&star, follow, &cancel).await;
                match &result {
                    Err(ClientError::Cancelled) => debug!(feed = %star.feed, "Redeeming invite cancelled"),
                    Err(e) => {
                        info!(feed = %star.feed, error = %e, "Redeeming invite failed");
                        self.telemetry.report("mission.redeem_invite", e);
                    }
                    Ok(()) => {}
                }
                TaskReport::Redeemed(result)
            }
            MissionTask::Sync { peers, quality } => {
                debug!(task = %id, peers = peers.len(), "Syncing");
                let result = self.sync(peers, quality, &cancel).await;
                if let Err(e) = &result {
                    self.telemetry.report("mission.sync", e);
                }
                TaskReport::Synced(result)
            }
        }
    }

    /// Redeem `star`'s invite, then announce it and optionally follow it.
    /// Announcing and following are attempted even when redemption fails;
    /// their errors are only reported. Once `cancel` fires, the next step
    /// is skipped and the task ends with `Cancelled`.
    async fn redeem(&self, star: &Star, follow: bool, cancel: &CancellationToken) -> Result<()> {
        let redeemed = self.store.redeem_invitation(star).await.map_err(ClientError::from);

        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        if let Err(e) = self.store.publish(Content::Pub(star.to_pub())).await {
            warn!(feed = %star.feed, error = %e, "Publishing pub announcement failed");
            self.telemetry.report("mission.publish_pub", &e);
        }

        if follow {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            if let Err(e) = self.store.publish(Content::Contact(Contact::follow(star.feed.clone()))).await {
                warn!(feed = %star.feed, error = %e, "Following star failed");
                self.telemetry.report("mission.follow_star", &e);
            }
        }

        redeemed
    }

    /// Connect to the candidate peers; succeeds when at least one connects.
    async fn sync(&self, mut peers: Vec<MultiserverAddress>, quality: SyncQuality, cancel: &CancellationToken) -> Result<usize> {
        let policy = quality.policy();
        if let Some(max) = policy.max_peers {
            peers.shuffle(&mut rand::thread_rng());
            peers.truncate(max);
        }
        if peers.is_empty() {
            return Err(ClientError::NoPeers);
        }

        let results = join_all(peers.iter().map(|peer| self.dial(peer, policy, cancel))).await;

        let mut connected = 0;
        let mut last_error = None;
        for result in results {
            match result {
                Ok(()) => connected += 1,
                Err(e) => last_error = Some(e),
            }
        }

        if connected == 0 {
            return Err(last_error.unwrap_or(ClientError::NoPeers));
        }
        self.activity.record_sync(connected);
        Ok(connected)
    }

    async fn dial(&self, peer: &MultiserverAddress, policy: RetryPolicy, cancel: &CancellationToken) -> Result<()> {
        let mut delay = policy.backoff;
        let mut last_error = ClientError::NoPeers;

        for attempt in 1..=policy.attempts {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            if attempt > 1 {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }

            match self.store.connect(peer).await {
                Ok(()) => {
                    debug!(peer = %peer, attempt, "Connected");
                    self.record_attempt(peer, None).await;
                    return Ok(());
                }
                Err(e) => {
                    debug!(peer = %peer, attempt, error = %e, "Connection attempt failed");
                    self.record_attempt(peer, Some(e.to_string())).await;
                    last_error = e.into();
                }
            }
        }

        Err(last_error)
    }

    /// Remember the outcome on the pub's address row, if the view knows it.
    async fn record_attempt(&self, peer: &MultiserverAddress, error: Option<String>) {
        let view = self.view.clone();
        let address = peer.clone();
        let result =
            tokio::task::spawn_blocking(move || view.record_pub_attempt(&address, error.as_deref())).await;

        match result {
            Ok(Ok(())) | Ok(Err(StoreError::NotFound)) => {}
            Ok(Err(e)) => self.telemetry.report("mission.record_attempt", &e),
            Err(e) => self.telemetry.report("mission.record_attempt", &e),
        }
    }
}
