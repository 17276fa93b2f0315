use rusqlite::params;

use crate::database::{now_ms, ViewDatabase};
use crate::error::Result;
use crate::models::Hashtag;

impl ViewDatabase {
    /// Hashtags with the number of visible posts carrying them, most used first.
    pub fn hashtags(&self) -> Result<Vec<Hashtag>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.name, COUNT(m.msg_id) AS uses
                 FROM channels c
                 JOIN channel_assignments ca ON ca.chan_ref = c.id
                 JOIN messages m ON m.msg_id = ca.msg_ref
                 WHERE m.hidden = 0 AND m.claimed_at <= ?1
                 GROUP BY c.id
                 ORDER BY uses DESC, c.name ASC",
            )?;
            let rows = stmt.query_map(params![now_ms()], |row| {
                Ok(Hashtag {
                    name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?;

            let mut tags = Vec::new();
            for row in rows {
                tags.push(row?);
            }
            Ok(tags)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::feed::HashtagPosts;
    use crate::test_support::{feed, minutes_ago, open_view, FeedWriter};
    use skuttle_shared::content::{Mention, Post};
    use skuttle_shared::Content;

    fn tagged(text: &str, tags: &[&str]) -> Content {
        let mut post = Post::new(text);
        post.mentions = tags.iter().map(|tag| Mention::hashtag(tag)).collect();
        Content::Post(post)
    }

    #[test]
    fn test_hashtag_counts_and_feed() {
        let view = open_view();
        let mut alice = FeedWriter::new(feed(70));
        let batch = vec![
            alice.append(tagged("one", &["rust", "sqlite"]), minutes_ago(3)),
            alice.append(tagged("two", &["Rust"]), minutes_ago(2)),
            alice.append(tagged("three", &["gossip"]), minutes_ago(1)),
        ];
        view.db.index(&batch).unwrap();

        let tags = view.db.hashtags().unwrap();
        assert_eq!(tags[0].name, "rust");
        assert_eq!(tags[0].count, 2);
        assert_eq!(tags.len(), 3);

        let posts = view.db.feed(&HashtagPosts::new("#RUST"), 10, 0).unwrap();
        let texts: Vec<_> = posts.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "one"]);
    }
}
