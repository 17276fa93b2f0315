//! # skuttle-store
//!
//! Materialized view over the replicated log, backed by SQLite.
//!
//! The indexer projects ordered batches of log entries into relational
//! tables keyed by small surrogate ids; feed strategies page through those
//! tables with shared visibility rules. [`ViewDatabase`] is synchronous;
//! async callers run it on a blocking thread.

pub mod database;
pub mod feed;
pub mod migrations;
pub mod models;

mod abouts;
mod channels;
mod contacts;
mod error;
mod ids;
mod indexer;
mod moderation;
mod posts;
mod pubs;
mod replies;
mod stats;

#[cfg(test)]
mod test_support;

pub use database::ViewDatabase;
pub use error::{Result, StoreError};
pub use feed::{FeedStrategy, QueryContext, Selection};
pub use indexer::UnknownContent;
pub use models::*;
