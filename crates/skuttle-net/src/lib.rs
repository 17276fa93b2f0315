// Replication contract and peer bookkeeping for the local log store.

pub mod discovery;
pub mod error;
pub mod log_store;
pub mod peers;

pub use discovery::{load_stars, parse_stars};
pub use error::{NetError, Result};
pub use log_store::{LogStore, RepoStatus};
pub use peers::{ConnectionInfo, PeerDiff, PeerTracker};
