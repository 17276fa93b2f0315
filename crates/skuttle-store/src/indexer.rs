//! Projection of replicated log entries into the relational view.
//!
//! A batch is applied inside one write transaction. Entries must arrive in
//! ascending sequence order per feed: an entry at or below the feed's
//! indexed head is a duplicate and is skipped, an entry beyond `head + 1`
//! fails the batch with [`StoreError::SequenceGap`].

use rusqlite::{params, Connection, OptionalExtension};
use skuttle_shared::content::{About, Contact, Post, PubAnnouncement, Vote};
use skuttle_shared::{Content, MentionTarget, Message, MessageId};
use tracing::{debug, info, warn};

use crate::database::ViewDatabase;
use crate::error::{Result, StoreError};
use crate::ids;

/// What the indexer does with entries whose content it cannot project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownContent {
    /// Fail the whole batch with `UnexpectedContentType`.
    #[default]
    Abort,
    /// Record the entry and its sequence, project nothing.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Applied,
    Duplicate,
    Expired,
    Unprojected,
}

impl ViewDatabase {
    /// Index an ordered batch, failing on unknown content.
    ///
    /// Returns the number of entries projected. Nothing is written when an
    /// error is returned.
    pub fn index(&self, batch: &[Message]) -> Result<usize> {
        self.index_with(batch, UnknownContent::Abort)
    }

    pub fn index_with(&self, batch: &[Message], unknown: UnknownContent) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let cutoff = self.cutoff_ms();
        let (applied, skipped) = self.write(|tx| {
            let mut applied = 0usize;
            let mut skipped = 0usize;
            for msg in batch {
                match index_one(tx, msg, cutoff, unknown)? {
                    Outcome::Applied => applied += 1,
                    Outcome::Duplicate | Outcome::Expired | Outcome::Unprojected => skipped += 1,
                }
            }
            if let Some(rx_seq) = batch.iter().filter_map(|msg| msg.received_seq).max() {
                advance_cursor(tx, rx_seq)?;
            }
            Ok((applied, skipped))
        })?;

        if skipped > 0 {
            debug!(applied, skipped, "indexed batch with skipped entries");
        } else {
            debug!(applied, "indexed batch");
        }
        Ok(applied)
    }

    /// Highest indexed sequence of a feed, 0 when nothing was indexed.
    pub fn feed_head(&self, author: &skuttle_shared::FeedId) -> Result<i64> {
        self.read(|conn| match ids::known_author(conn, author)? {
            Some(author_id) => feed_head(conn, author_id),
            None => Ok(0),
        })
    }
}

fn index_one(conn: &Connection, msg: &Message, cutoff: i64, unknown: UnknownContent) -> Result<Outcome> {
    let author_id = ids::author_id(conn, msg.author.as_str(), true)?;

    let head = feed_head(conn, author_id)?;
    if msg.sequence <= head {
        return Ok(Outcome::Duplicate);
    }
    if msg.sequence != head + 1 {
        return Err(StoreError::SequenceGap {
            author: msg.author.to_string(),
            expected: head + 1,
            got: msg.sequence,
        });
    }

    if let Content::Unknown { content_type } = &msg.content {
        if unknown == UnknownContent::Abort {
            return Err(StoreError::UnexpectedContentType {
                key: msg.key.clone(),
                content_type: content_type.clone(),
            });
        }
    }

    conn.execute(
        "INSERT INTO feed_heads (author_id, sequence) VALUES (?1, ?2)
         ON CONFLICT(author_id) DO UPDATE SET sequence = excluded.sequence",
        params![author_id, msg.sequence],
    )?;

    // the social graph and profiles are kept regardless of age
    let exempt = matches!(msg.content, Content::Contact(_) | Content::About(_));
    if !exempt && msg.claimed_at < cutoff {
        return Ok(Outcome::Expired);
    }

    let msg_ref = ids::msg_id(conn, &msg.key, true)?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO messages
            (msg_id, author_id, sequence, type, received_at, claimed_at, is_decrypted, rx_seq)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            msg_ref,
            author_id,
            msg.sequence,
            msg.content.type_name(),
            msg.received_at,
            msg.claimed_at,
            msg.is_private,
            msg.received_seq,
        ],
    )?;
    if inserted == 0 {
        // same key already indexed under another position
        warn!(key = %msg.key, "skipping duplicate message key");
        return Ok(Outcome::Duplicate);
    }

    match &msg.content {
        Content::Post(post) => fill_post(conn, msg_ref, post)?,
        Content::Contact(contact) => fill_contact(conn, msg_ref, author_id, contact)?,
        Content::Vote(vote) => fill_vote(conn, msg_ref, vote)?,
        Content::About(about) => fill_about(conn, msg_ref, about)?,
        Content::Pub(announcement) => fill_pub(conn, author_id, announcement)?,
        Content::Unknown { content_type } => {
            debug!(key = %msg.key, content_type = %content_type, "recorded entry without projection");
            return Ok(Outcome::Unprojected);
        }
    }

    Ok(Outcome::Applied)
}

fn advance_cursor(conn: &Connection, rx_seq: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO receive_cursor (id, rx_seq) VALUES (0, ?1)
         ON CONFLICT(id) DO UPDATE SET rx_seq = MAX(rx_seq, excluded.rx_seq)",
        params![rx_seq],
    )?;
    Ok(())
}

pub(crate) fn feed_head(conn: &Connection, author_id: i64) -> Result<i64> {
    let head = conn
        .query_row(
            "SELECT sequence FROM feed_heads WHERE author_id = ?1",
            params![author_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(head.unwrap_or(0))
}

fn fill_post(conn: &Connection, msg_ref: i64, post: &Post) -> Result<()> {
    conn.execute(
        "INSERT INTO posts (msg_ref, text, is_root) VALUES (?1, ?2, ?3)",
        params![msg_ref, post.text, post.is_root()],
    )?;

    insert_branches(conn, msg_ref, post.root.as_ref(), &post.branch)?;

    for mention in &post.mentions {
        match mention.target() {
            MentionTarget::Feed(feed) => {
                let feed_id = ids::author_id(conn, feed.as_str(), true)?;
                conn.execute(
                    "INSERT INTO mention_feed (msg_ref, feed_id, name) VALUES (?1, ?2, ?3)",
                    params![msg_ref, feed_id, mention.name],
                )?;
            }
            MentionTarget::Message(key) => {
                let link_id = ids::msg_id(conn, &key, true)?;
                conn.execute(
                    "INSERT INTO mention_message (msg_ref, link_id) VALUES (?1, ?2)",
                    params![msg_ref, link_id],
                )?;
            }
            MentionTarget::Blob(blob) if mention.is_image() => {
                conn.execute(
                    "INSERT INTO post_blobs
                        (msg_ref, identifier, name, meta_bytes, meta_width, meta_height,
                         meta_mime_type, meta_average_color_rgb)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        msg_ref,
                        blob.as_str(),
                        mention.name,
                        mention.size,
                        mention.dimensions.map(|d| d.width),
                        mention.dimensions.map(|d| d.height),
                        mention.mime_type,
                        mention.average_color_rgb,
                    ],
                )?;
            }
            MentionTarget::Hashtag(tag) => {
                conn.execute(
                    "INSERT OR IGNORE INTO channels (name) VALUES (?1)",
                    params![tag],
                )?;
                let chan_ref: i64 = conn.query_row(
                    "SELECT id FROM channels WHERE name = ?1",
                    params![tag],
                    |row| row.get(0),
                )?;
                conn.execute(
                    "INSERT OR IGNORE INTO channel_assignments (msg_ref, chan_ref) VALUES (?1, ?2)",
                    params![msg_ref, chan_ref],
                )?;
            }
            MentionTarget::Blob(_) | MentionTarget::Invalid => continue,
        }
    }

    Ok(())
}

fn insert_branches(
    conn: &Connection,
    msg_ref: i64,
    root: Option<&MessageId>,
    branches: &[MessageId],
) -> Result<()> {
    let Some(root) = root else {
        return Ok(());
    };

    let root_id = ids::msg_id(conn, root, true)?;
    conn.execute(
        "INSERT INTO tangles (msg_ref, root) VALUES (?1, ?2)",
        params![msg_ref, root_id],
    )?;
    let tangle_id = conn.last_insert_rowid();

    for branch in branches {
        let branch_id = ids::msg_id(conn, branch, true)?;
        conn.execute(
            "INSERT INTO branches (tangle_id, branch) VALUES (?1, ?2)",
            params![tangle_id, branch_id],
        )?;
    }
    Ok(())
}

fn fill_contact(conn: &Connection, msg_ref: i64, author_id: i64, contact: &Contact) -> Result<()> {
    let Some(state) = contact.state() else {
        info!(contact = %contact.contact, "ignoring contact that both follows and blocks");
        return Ok(());
    };

    let contact_id = ids::author_id(conn, contact.contact.as_str(), true)?;

    // latest wins: the previous edge is replaced, not kept
    conn.execute(
        "INSERT OR REPLACE INTO contacts (author_id, contact_id, state, msg_ref)
         VALUES (?1, ?2, ?3, ?4)",
        params![author_id, contact_id, state.as_i64(), msg_ref],
    )?;
    Ok(())
}

fn fill_vote(conn: &Connection, msg_ref: i64, vote: &Vote) -> Result<()> {
    let link_id = ids::msg_id(conn, &vote.vote.link, true)?;
    conn.execute(
        "INSERT INTO votes (msg_ref, link_id, value, expression) VALUES (?1, ?2, ?3, ?4)",
        params![msg_ref, link_id, vote.vote.value, vote.vote.expression],
    )?;

    insert_branches(conn, msg_ref, vote.root.as_ref(), &vote.branch)
}

fn fill_about(conn: &Connection, msg_ref: i64, about: &About) -> Result<()> {
    let Some(subject) = about.subject_feed() else {
        debug!(subject = %about.about, "ignoring about for a non-feed subject");
        return Ok(());
    };

    let about_id = ids::author_id(conn, subject.as_str(), true)?;
    conn.execute(
        "INSERT INTO abouts (about_id, msg_ref, name, description, image, public_web_hosting)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(about_id) DO UPDATE SET
            msg_ref            = excluded.msg_ref,
            name               = COALESCE(excluded.name, abouts.name),
            description        = COALESCE(excluded.description, abouts.description),
            image              = COALESCE(excluded.image, abouts.image),
            public_web_hosting = COALESCE(excluded.public_web_hosting, abouts.public_web_hosting)",
        params![
            about_id,
            msg_ref,
            about.name,
            about.description,
            about.image.as_ref().map(|image| image.link()),
            about.public_web_hosting,
        ],
    )?;
    Ok(())
}

fn fill_pub(conn: &Connection, author_id: i64, announcement: &PubAnnouncement) -> Result<()> {
    let relay_id = ids::author_id(conn, announcement.address.key.as_str(), true)?;
    let address = announcement.multiserver().to_string();

    conn.execute(
        "INSERT INTO addresses (about_id, announcer, address) VALUES (?1, ?2, ?3)
         ON CONFLICT(address) DO UPDATE SET announcer = excluded.announcer",
        params![relay_id, author_id, address],
    )?;
    Ok(())
}
