//! Paginated feed queries.
//!
//! A [`FeedStrategy`] contributes joins and a `WHERE` clause; the engine
//! wraps it with the visibility rules every feed shares (posts only, not
//! hidden, claimed time not in the future), orders, paginates and enriches
//! the page.
//!
//! Pagination is offset based. Entries indexed while a caller scrolls can
//! shift between pages.

mod strategies;

pub use strategies::{Discover, GlobalPosts, HashtagPosts, ProfilePosts, RecentPosts};

use std::fmt;

use rusqlite::types::Value;
use rusqlite::{Connection, ToSql};

use crate::database::{now_ms, ViewDatabase};
use crate::error::Result;
use crate::models::FeedEntry;
use crate::posts;

const VISIBLE: &str = "m.type = 'post' AND m.hidden = 0 AND m.claimed_at <= :now";

/// State a strategy may consult while building its selection.
pub struct QueryContext<'a> {
    pub conn: &'a Connection,
    /// Surrogate id of the identity owning the view.
    pub self_id: i64,
    /// Local clock (millis) the page is evaluated against.
    pub now: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Descending claimed timestamp.
    Newest,
    Random,
}

/// The part of a feed query a strategy controls.
///
/// `m` aliases `messages` and `p` aliases `posts`; `:now`, `:limit` and
/// `:offset` are reserved parameter names.
#[derive(Debug, Clone)]
pub struct Selection {
    pub joins: String,
    pub clause: String,
    pub binds: Vec<(&'static str, Value)>,
    pub order: Order,
}

impl Selection {
    pub fn new(clause: impl Into<String>) -> Self {
        Self {
            joins: String::new(),
            clause: clause.into(),
            binds: Vec::new(),
            order: Order::Newest,
        }
    }

    pub fn join(mut self, joins: impl Into<String>) -> Self {
        self.joins = joins.into();
        self
    }

    pub fn bind(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.binds.push((name, value.into()));
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }
}

pub trait FeedStrategy: fmt::Debug + Send + Sync {
    /// `None` when the feed is empty by construction (e.g. unknown author).
    fn select(&self, ctx: &QueryContext<'_>) -> Result<Option<Selection>>;
}

impl ViewDatabase {
    /// One page of `strategy`, enriched for display.
    pub fn feed(&self, strategy: &dyn FeedStrategy, limit: u32, offset: u32) -> Result<Vec<FeedEntry>> {
        self.read(|conn| {
            let ctx = QueryContext {
                conn,
                self_id: self.self_id(),
                now: now_ms(),
            };
            let ids = page(&ctx, strategy, limit, offset)?;
            posts::load_entries(conn, &ids)
        })
    }

    /// Number of entries `strategy` would page through.
    pub fn feed_count(&self, strategy: &dyn FeedStrategy) -> Result<i64> {
        self.read(|conn| {
            let ctx = QueryContext {
                conn,
                self_id: self.self_id(),
                now: now_ms(),
            };
            count(&ctx, strategy)
        })
    }

    /// Root posts, newest first.
    ///
    /// With `only_followed` the authors are the current identity and the
    /// feeds it follows, without it every other author.
    pub fn recent_posts(
        &self,
        limit: u32,
        offset: Option<u32>,
        want_private: bool,
        only_followed: bool,
    ) -> Result<Vec<FeedEntry>> {
        let strategy = RecentPosts {
            want_private,
            only_followed,
        };
        self.feed(&strategy, limit, offset.unwrap_or(0))
    }

    /// Root posts of one author. Fails with `BlockedAuthor` when the
    /// current identity blocks them.
    pub fn feed_for(&self, identity: &skuttle_shared::FeedId, limit: u32, offset: u32) -> Result<Vec<FeedEntry>> {
        self.feed(&ProfilePosts::new(identity.clone()), limit, offset)
    }
}

fn page(ctx: &QueryContext<'_>, strategy: &dyn FeedStrategy, limit: u32, offset: u32) -> Result<Vec<i64>> {
    let Some(selection) = strategy.select(ctx)? else {
        return Ok(Vec::new());
    };

    let order = match selection.order {
        Order::Newest => "m.claimed_at DESC",
        Order::Random => "RANDOM()",
    };
    let sql = format!(
        "SELECT m.msg_id
         FROM messages m
         JOIN posts p ON p.msg_ref = m.msg_id
         {joins}
         WHERE {VISIBLE} AND ({clause})
         ORDER BY {order}
         LIMIT :limit OFFSET :offset",
        joins = selection.joins,
        clause = selection.clause,
    );

    let mut binds: Vec<(&str, &dyn ToSql)> = vec![
        (":now", &ctx.now as &dyn ToSql),
        (":limit", &limit as &dyn ToSql),
        (":offset", &offset as &dyn ToSql),
    ];
    binds.extend(selection.binds.iter().map(|(name, value)| (*name, value as &dyn ToSql)));

    let mut stmt = ctx.conn.prepare(&sql)?;
    let ids = stmt
        .query_map(binds.as_slice(), |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

fn count(ctx: &QueryContext<'_>, strategy: &dyn FeedStrategy) -> Result<i64> {
    let Some(selection) = strategy.select(ctx)? else {
        return Ok(0);
    };

    let sql = format!(
        "SELECT COUNT(*)
         FROM messages m
         JOIN posts p ON p.msg_ref = m.msg_id
         {joins}
         WHERE {VISIBLE} AND ({clause})",
        joins = selection.joins,
        clause = selection.clause,
    );

    let mut binds: Vec<(&str, &dyn ToSql)> = vec![(":now", &ctx.now as &dyn ToSql)];
    binds.extend(selection.binds.iter().map(|(name, value)| (*name, value as &dyn ToSql)));

    Ok(ctx.conn.query_row(&sql, binds.as_slice(), |row| row.get(0))?)
}

/// The current identity plus everyone it follows.
pub(crate) fn follow_set(conn: &Connection, self_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT contact_id FROM contacts WHERE author_id = ?1 AND state = 1")?;
    let mut ids = stmt
        .query_map([self_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    ids.push(self_id);
    Ok(ids)
}

/// Inline a list of surrogate ids for an `IN (...)` clause.
pub(crate) fn id_list(ids: &[i64]) -> String {
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",")
}
