//! # skuttle-client
//!
//! Client core on top of the log store and the view database: missions
//! that keep the feed connected to enough system relays, the refresh pump
//! feeding the indexer, statistics snapshots, bearer-token caching and
//! feed queries that never run on the caller's thread.

pub mod activity;
pub mod config;
pub mod error;
pub mod feed_service;
pub mod mission;
pub mod refresh;
pub mod session;
pub mod statistics;
pub mod telemetry;
pub mod token;

#[cfg(test)]
mod test_support;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::{AppConfiguration, AppConfigurations, ConfigStore};
pub use error::{ClientError, Result};
pub use mission::{SyncOrchestrator, SyncQuality};
pub use refresh::{RefreshLoad, Refresher};
pub use session::Session;
pub use statistics::{BotStatistics, StatisticsCollector};
pub use telemetry::{Telemetry, TracingTelemetry};
pub use token::{HttpTokenFetcher, Token, TokenCache};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default directives.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("skuttle_client=debug,skuttle_net=debug,skuttle_store=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
