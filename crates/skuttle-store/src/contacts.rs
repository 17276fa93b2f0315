//! Social graph queries over the latest-wins contact edges.

use rusqlite::{params, Connection, OptionalExtension};
use skuttle_shared::{ContactState, FeedId};

use crate::database::ViewDatabase;
use crate::error::Result;
use crate::ids;
use crate::models::Relationship;
use crate::posts::parse_col;

impl ViewDatabase {
    /// Current edge from `from` to `to`. Only the latest contact message
    /// between the two is kept, so earlier states cannot be queried.
    pub fn contact_state(&self, from: &FeedId, to: &FeedId) -> Result<ContactState> {
        self.read(|conn| {
            let (Some(from_id), Some(to_id)) = (ids::known_author(conn, from)?, ids::known_author(conn, to)?) else {
                return Ok(ContactState::None);
            };
            state_between(conn, from_id, to_id)
        })
    }

    /// Edges in both directions between two identities.
    pub fn relationship(&self, a: &FeedId, b: &FeedId) -> Result<Relationship> {
        Ok(Relationship {
            from_state: self.contact_state(a, b)?,
            to_state: self.contact_state(b, a)?,
        })
    }

    /// Feeds `identity` follows.
    pub fn follows(&self, identity: &FeedId) -> Result<Vec<FeedId>> {
        self.edges(identity, Direction::Outgoing, ContactState::Following)
    }

    /// Feeds following `identity`.
    pub fn followed_by(&self, identity: &FeedId) -> Result<Vec<FeedId>> {
        self.edges(identity, Direction::Incoming, ContactState::Following)
    }

    pub fn blocks(&self, identity: &FeedId) -> Result<Vec<FeedId>> {
        self.edges(identity, Direction::Outgoing, ContactState::Blocking)
    }

    pub fn blocked_by(&self, identity: &FeedId) -> Result<Vec<FeedId>> {
        self.edges(identity, Direction::Incoming, ContactState::Blocking)
    }

    /// Feeds that follow `identity` and are followed back.
    pub fn friends(&self, identity: &FeedId) -> Result<Vec<FeedId>> {
        self.read(|conn| {
            let Some(id) = ids::known_author(conn, identity)? else {
                return Ok(Vec::new());
            };
            let mut stmt = conn.prepare(
                "SELECT a.author
                 FROM contacts fwd
                 JOIN contacts back ON back.author_id = fwd.contact_id AND back.contact_id = fwd.author_id
                 JOIN authors a ON a.id = fwd.contact_id
                 WHERE fwd.author_id = ?1 AND fwd.state = 1 AND back.state = 1
                 ORDER BY a.author",
            )?;
            let rows = stmt
                .query_map(params![id], |row| parse_col(row, 0))?
                .collect::<rusqlite::Result<Vec<FeedId>>>()?;
            Ok(rows)
        })
    }

    fn edges(&self, identity: &FeedId, direction: Direction, state: ContactState) -> Result<Vec<FeedId>> {
        self.read(|conn| {
            let Some(id) = ids::known_author(conn, identity)? else {
                return Ok(Vec::new());
            };
            let sql = match direction {
                Direction::Outgoing => {
                    "SELECT a.author FROM contacts c JOIN authors a ON a.id = c.contact_id
                     WHERE c.author_id = ?1 AND c.state = ?2 ORDER BY a.author"
                }
                Direction::Incoming => {
                    "SELECT a.author FROM contacts c JOIN authors a ON a.id = c.author_id
                     WHERE c.contact_id = ?1 AND c.state = ?2 ORDER BY a.author"
                }
            };
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params![id, state.as_i64()], |row| parse_col(row, 0))?
                .collect::<rusqlite::Result<Vec<FeedId>>>()?;
            Ok(rows)
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Outgoing,
    Incoming,
}

pub(crate) fn state_between(conn: &Connection, from_id: i64, to_id: i64) -> Result<ContactState> {
    let state: Option<i64> = conn
        .query_row(
            "SELECT state FROM contacts WHERE author_id = ?1 AND contact_id = ?2",
            params![from_id, to_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(state.map(ContactState::from_i64).unwrap_or(ContactState::None))
}
