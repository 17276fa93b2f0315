//! Surrogate-id interning.
//!
//! Feed and message keys are mapped to small integers on first sight; with
//! `make` set a placeholder row is created for keys that were never seen.

use rusqlite::{params, Connection, OptionalExtension};
use skuttle_shared::{FeedId, MessageId};

use crate::error::{Result, StoreError};

pub(crate) fn author_id(conn: &Connection, author: &str, make: bool) -> Result<i64> {
    let found = conn
        .query_row(
            "SELECT id FROM authors WHERE author = ?1",
            params![author],
            |row| row.get(0),
        )
        .optional()?;

    match found {
        Some(id) => Ok(id),
        None if make => {
            conn.execute("INSERT INTO authors (author) VALUES (?1)", params![author])?;
            Ok(conn.last_insert_rowid())
        }
        None => Err(StoreError::UnknownAuthor(author.to_string())),
    }
}

/// Surrogate id of a feed that may not have been seen yet.
pub(crate) fn known_author(conn: &Connection, identity: &FeedId) -> Result<Option<i64>> {
    match author_id(conn, identity.as_str(), false) {
        Ok(id) => Ok(Some(id)),
        Err(StoreError::UnknownAuthor(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn msg_id(conn: &Connection, key: &MessageId, make: bool) -> Result<i64> {
    let found = conn
        .query_row(
            "SELECT id FROM messagekeys WHERE key = ?1",
            params![key.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    match found {
        Some(id) => Ok(id),
        None if make => {
            conn.execute("INSERT INTO messagekeys (key) VALUES (?1)", params![key.as_str()])?;
            Ok(conn.last_insert_rowid())
        }
        None => Err(StoreError::UnknownMessage(key.clone())),
    }
}

pub(crate) fn author_of(conn: &Connection, id: i64) -> Result<FeedId> {
    let raw: Option<String> = conn
        .query_row("SELECT author FROM authors WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    raw.and_then(|raw| raw.parse().ok())
        .ok_or(StoreError::UnknownReferenceId(id))
}

pub(crate) fn msg_key(conn: &Connection, id: i64) -> Result<MessageId> {
    let raw: Option<String> = conn
        .query_row("SELECT key FROM messagekeys WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    raw.and_then(|raw| raw.parse().ok())
        .ok_or(StoreError::UnknownReferenceId(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_author_interning() {
        let conn = conn();
        let feed = FeedId::from_bytes(&[3; 32]);

        assert!(matches!(
            author_id(&conn, feed.as_str(), false),
            Err(StoreError::UnknownAuthor(_))
        ));
        let id = author_id(&conn, feed.as_str(), true).unwrap();
        assert_eq!(author_id(&conn, feed.as_str(), true).unwrap(), id);
        assert_eq!(author_of(&conn, id).unwrap(), feed);
    }

    #[test]
    fn test_unknown_message_vs_unknown_reference() {
        let conn = conn();
        let key = MessageId::from_bytes(&[4; 32]);

        assert!(matches!(msg_id(&conn, &key, false), Err(StoreError::UnknownMessage(_))));
        assert!(matches!(msg_key(&conn, 99), Err(StoreError::UnknownReferenceId(99))));

        let id = msg_id(&conn, &key, true).unwrap();
        assert_eq!(msg_key(&conn, id).unwrap(), key);
    }
}
