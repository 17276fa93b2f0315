//! Thread and mention queries.

use rusqlite::{params, Connection};
use skuttle_shared::MessageId;

use crate::database::{now_ms, ViewDatabase};
use crate::error::{Result, StoreError};
use crate::ids;
use crate::models::{millis_to_date, FeedEntry, ThreadItem, VoteEntry};
use crate::posts::{load_entries, load_entry, parse_col};

impl ViewDatabase {
    /// Posts and votes in the thread under `root`, oldest first.
    pub fn replies_to(&self, root: &MessageId) -> Result<Vec<ThreadItem>> {
        self.read(|conn| {
            let root_id = ids::msg_id(conn, root, false)?;
            let mut stmt = conn.prepare(
                "SELECT m.msg_id, m.type
                 FROM tangles t
                 JOIN messages m ON m.msg_id = t.msg_ref
                 WHERE t.root = ?1 AND m.type IN ('post', 'vote')
                   AND m.hidden = 0 AND m.claimed_at <= ?2
                 ORDER BY m.claimed_at ASC",
            )?;
            let rows = stmt
                .query_map(params![root_id, now_ms()], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut items = Vec::with_capacity(rows.len());
            for (msg_ref, kind) in rows {
                let item = match kind.as_str() {
                    "post" => ThreadItem::Post(load_entry(conn, msg_ref)?),
                    _ => ThreadItem::Vote(load_vote(conn, msg_ref)?),
                };
                items.push(item);
            }
            Ok(items)
        })
    }

    /// Recent posts by others that mention the current identity.
    pub fn mentions(&self, limit: u32) -> Result<Vec<FeedEntry>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT m.msg_id, m.claimed_at
                 FROM mention_feed mf
                 JOIN messages m ON m.msg_id = mf.msg_ref
                 WHERE mf.feed_id = ?1 AND m.author_id != ?1
                   AND m.type = 'post' AND m.hidden = 0 AND m.claimed_at <= ?2
                 ORDER BY m.claimed_at DESC
                 LIMIT ?3",
            )?;
            let ids = stmt
                .query_map(params![self.self_id(), now_ms(), limit], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            load_entries(conn, &ids)
        })
    }
}

fn load_vote(conn: &Connection, msg_ref: i64) -> Result<VoteEntry> {
    let vote = conn.query_row(
        "SELECT mk.key, a.author, m.claimed_at, lk.key, v.value, v.expression
         FROM votes v
         JOIN messages m     ON m.msg_id = v.msg_ref
         JOIN messagekeys mk ON mk.id = m.msg_id
         JOIN authors a      ON a.id = m.author_id
         JOIN messagekeys lk ON lk.id = v.link_id
         WHERE v.msg_ref = ?1",
        params![msg_ref],
        |row| {
            Ok(VoteEntry {
                key: parse_col(row, 0)?,
                author: parse_col(row, 1)?,
                claimed_at: millis_to_date(row.get(2)?),
                link: parse_col(row, 3)?,
                value: row.get(4)?,
                expression: row.get(5)?,
            })
        },
    );
    match vote {
        Ok(vote) => Ok(vote),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::UnknownReferenceId(msg_ref)),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{feed, minutes_ago, open_view, FeedWriter};
    use skuttle_shared::content::{Mention, Post, Vote, VoteLink};
    use skuttle_shared::Content;

    #[test]
    fn test_thread_in_claimed_order() {
        let view = open_view();
        let mut alice = FeedWriter::new(feed(60));
        let mut bob = FeedWriter::new(feed(61));
        let root = alice.post("root", minutes_ago(30));
        let like = Vote {
            vote: VoteLink {
                link: root.key.clone(),
                value: 1,
                expression: Some("yup".into()),
            },
            root: Some(root.key.clone()),
            branch: vec![root.key.clone()],
        };
        let batch = vec![
            root.clone(),
            bob.append(Content::Post(Post::reply("first!", root.key.clone())), minutes_ago(20)),
            bob.append(Content::Vote(like), minutes_ago(10)),
            alice.append(Content::Post(Post::reply("thanks", root.key.clone())), minutes_ago(5)),
        ];
        view.db.index(&batch).unwrap();

        let thread = view.db.replies_to(&root.key).unwrap();
        assert_eq!(thread.len(), 3);
        assert!(thread.windows(2).all(|w| w[0].claimed_at() < w[1].claimed_at()));
        match &thread[1] {
            ThreadItem::Vote(vote) => {
                assert_eq!(vote.link, root.key);
                assert_eq!(vote.expression.as_deref(), Some("yup"));
            }
            other => panic!("expected vote, got {other:?}"),
        }

        let entry = view.db.post(&root.key).unwrap();
        assert_eq!(entry.replies.count, 3);
        assert_eq!(entry.replies.repliers.len(), 2);
        assert_eq!(entry.replies.repliers[0].identity, alice.author);

        assert!(matches!(
            view.db.replies_to(&MessageId::from_bytes(&[250; 32])),
            Err(StoreError::UnknownMessage(_))
        ));
    }

    #[test]
    fn test_mentions_of_self() {
        let view = open_view();
        let mut bob = FeedWriter::new(feed(61));
        let mut shout = Post::new("hey you");
        shout.mentions.push(Mention::feed(&view.me, "me"));
        let batch = vec![
            bob.post("unrelated", minutes_ago(3)),
            bob.append(Content::Post(shout), minutes_ago(2)),
        ];
        view.db.index(&batch).unwrap();

        let found = view.db.mentions(10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "hey you");
    }
}
