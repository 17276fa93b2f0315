use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use skuttle_shared::constants::REPLY_SAMPLE_SIZE;
use skuttle_shared::content::Dimensions;
use skuttle_shared::MessageId;

use crate::database::ViewDatabase;
use crate::error::{Result, StoreError};
use crate::ids;
use crate::models::{millis_to_date, AboutRow, BlobRow, FeedEntry, Replier, ReplySummary};

impl ViewDatabase {
    /// Surrogate id of a message key; `UnknownMessage` if it was never seen.
    pub fn message_ref(&self, key: &MessageId) -> Result<i64> {
        self.read(|conn| ids::msg_id(conn, key, false))
    }

    /// A single post with its enrichment, regardless of feed visibility.
    pub fn post(&self, key: &MessageId) -> Result<FeedEntry> {
        self.read(|conn| {
            let msg_ref = ids::msg_id(conn, key, false)?;
            load_entry(conn, msg_ref)
        })
    }
}

const ENTRY_SQL: &str = "
    SELECT mk.key, a.author, m.sequence, m.claimed_at, m.received_at,
           p.text, p.is_root, rk.key, m.is_decrypted, m.author_id
    FROM messages m
    JOIN messagekeys mk ON mk.id = m.msg_id
    JOIN authors a      ON a.id = m.author_id
    JOIN posts p        ON p.msg_ref = m.msg_id
    LEFT JOIN tangles t      ON t.msg_ref = m.msg_id
    LEFT JOIN messagekeys rk ON rk.id = t.root
    WHERE m.msg_id = ?1";

/// Load a post and attach its author profile, reply summary and blobs.
pub(crate) fn load_entry(conn: &Connection, msg_ref: i64) -> Result<FeedEntry> {
    let (mut entry, author_id) = conn
        .query_row(ENTRY_SQL, params![msg_ref], row_to_entry)
        .optional()?
        .ok_or(StoreError::NotFound)?;

    entry.about = load_about(conn, author_id)?;
    entry.replies = reply_summary(conn, msg_ref)?;
    entry.blobs = load_blobs(conn, msg_ref)?;
    Ok(entry)
}

pub(crate) fn load_entries(conn: &Connection, msg_refs: &[i64]) -> Result<Vec<FeedEntry>> {
    msg_refs.iter().map(|id| load_entry(conn, *id)).collect()
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<(FeedEntry, i64)> {
    let root: Option<String> = row.get(7)?;
    let root = match root {
        Some(raw) => Some(parse_text(7, &raw)?),
        None => None,
    };

    let entry = FeedEntry {
        key: parse_col(row, 0)?,
        author: parse_col(row, 1)?,
        sequence: row.get(2)?,
        claimed_at: millis_to_date(row.get(3)?),
        received_at: millis_to_date(row.get(4)?),
        text: row.get(5)?,
        is_root: row.get(6)?,
        root,
        is_private: row.get(8)?,
        about: None,
        replies: ReplySummary::default(),
        blobs: Vec::new(),
    };
    Ok((entry, row.get(9)?))
}

pub(crate) fn load_about(conn: &Connection, author_id: i64) -> Result<Option<AboutRow>> {
    let about = conn
        .query_row(
            "SELECT a.author, ab.name, ab.description, ab.image, ab.public_web_hosting
             FROM abouts ab
             JOIN authors a ON a.id = ab.about_id
             WHERE ab.about_id = ?1",
            params![author_id],
            |row| {
                Ok(AboutRow {
                    about: parse_col(row, 0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    image: row.get(3)?,
                    public_web_hosting: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(about)
}

/// Count of posts and votes in the thread plus a few distinct repliers.
pub(crate) fn reply_summary(conn: &Connection, msg_ref: i64) -> Result<ReplySummary> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM tangles t
         JOIN messages m ON m.msg_id = t.msg_ref
         WHERE t.root = ?1 AND m.type IN ('post', 'vote') AND m.hidden = 0",
        params![msg_ref],
        |row| row.get(0),
    )?;
    if count == 0 {
        return Ok(ReplySummary::default());
    }

    let mut stmt = conn.prepare(
        "SELECT m.author_id
         FROM tangles t
         JOIN messages m ON m.msg_id = t.msg_ref
         WHERE t.root = ?1 AND m.type IN ('post', 'vote') AND m.hidden = 0
         GROUP BY m.author_id
         ORDER BY MAX(m.claimed_at) DESC
         LIMIT ?2",
    )?;
    let author_ids = stmt
        .query_map(params![msg_ref, REPLY_SAMPLE_SIZE as i64], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut repliers = Vec::with_capacity(author_ids.len());
    for author_id in author_ids {
        repliers.push(Replier {
            identity: ids::author_of(conn, author_id)?,
            about: load_about(conn, author_id)?,
        });
    }

    Ok(ReplySummary { count, repliers })
}

fn load_blobs(conn: &Connection, msg_ref: i64) -> Result<Vec<BlobRow>> {
    let mut stmt = conn.prepare(
        "SELECT identifier, name, meta_bytes, meta_width, meta_height,
                meta_mime_type, meta_average_color_rgb
         FROM post_blobs
         WHERE msg_ref = ?1",
    )?;
    let rows = stmt.query_map(params![msg_ref], |row| {
        let width: Option<i64> = row.get(3)?;
        let height: Option<i64> = row.get(4)?;
        Ok(BlobRow {
            identifier: parse_col(row, 0)?,
            name: row.get(1)?,
            size: row.get(2)?,
            dimensions: width.zip(height).map(|(width, height)| Dimensions { width, height }),
            mime_type: row.get(5)?,
            average_color_rgb: row.get(6)?,
        })
    })?;

    let mut blobs = Vec::new();
    for row in rows {
        blobs.push(row?);
    }
    Ok(blobs)
}

/// Read a text column and parse it into a validated reference.
pub(crate) fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parse_text(idx, &raw)
}

fn parse_text<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
