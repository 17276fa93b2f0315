//! Counters consumed by the statistics snapshot.

use rusqlite::{params, Connection};
use skuttle_shared::FeedId;

use crate::database::ViewDatabase;
use crate::error::Result;
use crate::ids;
use crate::models::TableCounts;

fn count(conn: &Connection, table: &str) -> Result<i64> {
    Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
}

impl ViewDatabase {
    pub fn table_counts(&self) -> Result<TableCounts> {
        self.read(|conn| {
            Ok(TableCounts {
                authors: count(conn, "authors")?,
                messages: count(conn, "messages")?,
                posts: count(conn, "posts")?,
                votes: count(conn, "votes")?,
                contacts: count(conn, "contacts")?,
                abouts: count(conn, "abouts")?,
                hashtags: count(conn, "channels")?,
                addresses: count(conn, "addresses")?,
            })
        })
    }

    /// Highest receive-log position consumed so far, `-1` when none is
    /// known. Entries skipped as duplicates or for their age count as
    /// consumed.
    pub fn last_received_seq(&self) -> Result<i64> {
        self.read(|conn| {
            let seq: Option<i64> = conn.query_row(
                "SELECT MAX(seq) FROM (
                    SELECT rx_seq AS seq FROM receive_cursor
                    UNION ALL
                    SELECT MAX(rx_seq) FROM messages
                 )",
                [],
                |row| row.get(0),
            )?;
            Ok(seq.unwrap_or(-1))
        })
    }

    /// Entries of `identity` present in the view.
    pub fn published_count(&self, identity: &FeedId) -> Result<i64> {
        self.read(|conn| {
            let Some(author_id) = ids::known_author(conn, identity)? else {
                return Ok(0);
            };
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE author_id = ?1",
                params![author_id],
                |row| row.get(0),
            )?)
        })
    }

    /// Number of public root posts, optionally of one author.
    pub fn root_post_count(&self, author: Option<&FeedId>) -> Result<i64> {
        self.read(|conn| {
            let author_id = match author {
                None => None,
                Some(identity) => match ids::known_author(conn, identity)? {
                    Some(id) => Some(id),
                    None => return Ok(0),
                },
            };
            Ok(conn.query_row(
                "SELECT COUNT(*)
                 FROM posts p
                 JOIN messages m ON m.msg_id = p.msg_ref
                 WHERE p.is_root = 1 AND m.is_decrypted = 0 AND m.hidden = 0
                   AND (?1 IS NULL OR m.author_id = ?1)",
                params![author_id],
                |row| row.get(0),
            )?)
        })
    }
}
