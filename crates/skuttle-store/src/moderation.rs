//! Visibility toggles, removal and retention.

use rusqlite::params;
use skuttle_shared::FeedId;
use tracing::info;

use crate::database::ViewDatabase;
use crate::error::Result;
use crate::ids;

impl ViewDatabase {
    /// Hide every entry of `identity` from feeds and threads.
    pub fn hide_all_from(&self, identity: &FeedId) -> Result<usize> {
        self.set_hidden(identity, true)
    }

    pub fn unhide_all_from(&self, identity: &FeedId) -> Result<usize> {
        self.set_hidden(identity, false)
    }

    fn set_hidden(&self, identity: &FeedId, hidden: bool) -> Result<usize> {
        self.write(|tx| {
            let Some(author_id) = ids::known_author(tx, identity)? else {
                return Ok(0);
            };
            Ok(tx.execute(
                "UPDATE messages SET hidden = ?2 WHERE author_id = ?1",
                params![author_id, hidden],
            )?)
        })
    }

    /// Remove everything projected from `identity`'s feed.
    ///
    /// The feed head is reset so the feed can be indexed again from the start.
    pub fn delete_all_from(&self, identity: &FeedId) -> Result<usize> {
        let removed = self.write(|tx| {
            let Some(author_id) = ids::known_author(tx, identity)? else {
                return Ok(0);
            };
            tx.execute("DELETE FROM addresses WHERE announcer = ?1", params![author_id])?;
            tx.execute("DELETE FROM feed_heads WHERE author_id = ?1", params![author_id])?;
            Ok(tx.execute("DELETE FROM messages WHERE author_id = ?1", params![author_id])?)
        })?;

        info!(identity = %identity, removed, "deleted feed from view");
        Ok(removed)
    }

    /// Drop entries claimed before the retention window. Contacts and
    /// profiles are kept.
    pub fn prune_expired(&self) -> Result<usize> {
        let cutoff = self.cutoff_ms();
        let removed = self.write(|tx| {
            Ok(tx.execute(
                "DELETE FROM messages WHERE claimed_at < ?1 AND type NOT IN ('contact', 'about')",
                params![cutoff],
            )?)
        })?;

        if removed > 0 {
            info!(removed, "pruned expired entries");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::now_ms;
    use crate::test_support::{feed, minutes_ago, FeedWriter};
    use skuttle_shared::content::{Contact, Post};
    use skuttle_shared::Content;

    #[test]
    fn test_hide_and_unhide() {
        let view = crate::test_support::open_view();
        let mut bob = FeedWriter::new(feed(90));
        view.db.index(&[bob.post("visible?", minutes_ago(1))]).unwrap();

        assert_eq!(view.db.hide_all_from(&bob.author).unwrap(), 1);
        assert!(view.db.recent_posts(10, None, false, false).unwrap().is_empty());
        assert_eq!(view.db.unhide_all_from(&bob.author).unwrap(), 1);
        assert_eq!(view.db.recent_posts(10, None, false, false).unwrap().len(), 1);
        assert_eq!(view.db.hide_all_from(&feed(99)).unwrap(), 0);
    }

    #[test]
    fn test_delete_cascades_and_resets_head() {
        let view = crate::test_support::open_view();
        let mut bob = FeedWriter::new(feed(90));
        let root = bob.post("root", minutes_ago(3));
        let batch = vec![
            root.clone(),
            bob.append(Content::Post(Post::reply("reply", root.key.clone())), minutes_ago(2)),
            bob.append(Content::Contact(Contact::follow(feed(91))), minutes_ago(1)),
        ];
        view.db.index(&batch).unwrap();

        assert_eq!(view.db.delete_all_from(&bob.author).unwrap(), 3);
        let counts = view.db.table_counts().unwrap();
        assert_eq!((counts.messages, counts.posts, counts.contacts), (0, 0, 0));
        assert_eq!(view.db.feed_head(&bob.author).unwrap(), 0);

        // re-replication starts from the first entry again
        assert_eq!(view.db.index(&batch).unwrap(), 3);
    }

    #[test]
    fn test_prune_keeps_graph() {
        let dir = tempfile::tempdir().unwrap();
        let me = feed(1);
        // one hour retention
        let db = ViewDatabase::open(&dir.path().join("view.sqlite"), &me, 60 * 60 * 1000).unwrap();

        let mut bob = FeedWriter::new(feed(90));
        let batch = vec![
            bob.post("soon stale", minutes_ago(59)),
            bob.append(Content::Contact(Contact::follow(me.clone())), minutes_ago(59)),
            bob.post("fresh", now_ms()),
        ];
        assert_eq!(db.index(&batch).unwrap(), 3);

        // nothing is old enough yet
        assert_eq!(db.prune_expired().unwrap(), 0);

        let stale = ViewDatabase::open(&dir.path().join("view.sqlite"), &me, 30 * 60 * 1000).unwrap();
        drop(db);
        assert_eq!(stale.prune_expired().unwrap(), 1);
        assert_eq!(stale.table_counts().unwrap().contacts, 1);
        assert_eq!(stale.table_counts().unwrap().posts, 1);
    }
}
