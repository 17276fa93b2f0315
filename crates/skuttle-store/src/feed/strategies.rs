use skuttle_shared::{ContactState, FeedId};

use super::{follow_set, id_list, FeedStrategy, Order, QueryContext, Selection};
use crate::contacts;
use crate::error::{Result, StoreError};
use crate::ids;

/// Root posts split by the follow set of the current identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentPosts {
    /// Decryption state the posts must have.
    pub want_private: bool,
    /// `true`: authored by self or a followed feed. `false`: by anyone else.
    pub only_followed: bool,
}

impl FeedStrategy for RecentPosts {
    fn select(&self, ctx: &QueryContext<'_>) -> Result<Option<Selection>> {
        let follows = follow_set(ctx.conn, ctx.self_id)?;
        let membership = if self.only_followed { "IN" } else { "NOT IN" };

        Ok(Some(
            Selection::new(format!(
                "p.is_root = 1 AND m.is_decrypted = :private AND m.author_id {membership} ({})",
                id_list(&follows)
            ))
            .bind(":private", self.want_private),
        ))
    }
}

/// Every public root post except those of blocked authors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalPosts;

impl FeedStrategy for GlobalPosts {
    fn select(&self, ctx: &QueryContext<'_>) -> Result<Option<Selection>> {
        Ok(Some(
            Selection::new(
                "p.is_root = 1 AND m.is_decrypted = 0 AND m.author_id NOT IN (
                    SELECT contact_id FROM contacts WHERE author_id = :me AND state = -1
                )",
            )
            .bind(":me", ctx.self_id),
        ))
    }
}

/// Random public root posts from feeds the current identity has no edge to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Discover;

impl FeedStrategy for Discover {
    fn select(&self, ctx: &QueryContext<'_>) -> Result<Option<Selection>> {
        Ok(Some(
            Selection::new(
                "p.is_root = 1 AND m.is_decrypted = 0 AND m.author_id != :me
                 AND m.author_id NOT IN (
                    SELECT contact_id FROM contacts WHERE author_id = :me AND state != 0
                 )",
            )
            .bind(":me", ctx.self_id)
            .order(Order::Random),
        ))
    }
}

/// Public posts tagged with a hashtag, replies included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashtagPosts {
    tag: String,
}

impl HashtagPosts {
    /// Accepts the tag with or without the leading `#`; matching ignores case.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.trim_start_matches('#').to_lowercase(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl FeedStrategy for HashtagPosts {
    fn select(&self, _ctx: &QueryContext<'_>) -> Result<Option<Selection>> {
        Ok(Some(
            Selection::new("m.is_decrypted = 0 AND c.name = :tag")
                .join(
                    "JOIN channel_assignments ca ON ca.msg_ref = m.msg_id
                     JOIN channels c ON c.id = ca.chan_ref",
                )
                .bind(":tag", self.tag.clone()),
        ))
    }
}

/// Public root posts of a single author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePosts {
    identity: FeedId,
}

impl ProfilePosts {
    pub fn new(identity: FeedId) -> Self {
        Self { identity }
    }
}

impl FeedStrategy for ProfilePosts {
    fn select(&self, ctx: &QueryContext<'_>) -> Result<Option<Selection>> {
        let Some(author_id) = ids::known_author(ctx.conn, &self.identity)? else {
            return Ok(None);
        };

        if contacts::state_between(ctx.conn, ctx.self_id, author_id)? == ContactState::Blocking {
            return Err(StoreError::BlockedAuthor(self.identity.to_string()));
        }

        Ok(Some(
            Selection::new("p.is_root = 1 AND m.is_decrypted = 0 AND m.author_id = :author")
                .bind(":author", author_id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{feed, minutes_ago, open_view, FeedWriter};
    use skuttle_shared::content::{Contact, Mention, Post};
    use skuttle_shared::Content;

    #[test]
    fn test_only_followed_returns_self_and_follows() {
        let view = open_view();
        let mut me = FeedWriter::new(view.me.clone());
        let mut followed = FeedWriter::new(feed(20));
        let mut strangers = [FeedWriter::new(feed(30)), FeedWriter::new(feed(31)), FeedWriter::new(feed(32))];

        let mut batch = vec![me.append(Content::Contact(Contact::follow(followed.author.clone())), minutes_ago(60))];
        batch.push(followed.post("followed one", minutes_ago(10)));
        batch.push(followed.post("followed two", minutes_ago(9)));
        for (i, stranger) in strangers.iter_mut().enumerate() {
            batch.push(stranger.post("stranger", minutes_ago(8 - i as i64)));
        }
        batch.push(me.post("mine", minutes_ago(1)));
        view.db.index(&batch).unwrap();

        let followed_page = view.db.recent_posts(10, None, false, true).unwrap();
        let texts: Vec<_> = followed_page.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["mine", "followed two", "followed one"]);

        let others = view.db.recent_posts(10, None, false, false).unwrap();
        assert_eq!(others.len(), 3);
        assert!(others.iter().all(|e| e.text == "stranger"));
    }

    #[test]
    fn test_recent_posts_ordering_limit_and_visibility() {
        let view = open_view();
        let mut alice = FeedWriter::new(feed(20));
        let mut batch = Vec::new();
        for minutes in [50, 40, 30, 20, 10] {
            batch.push(alice.post("past", minutes_ago(minutes)));
        }
        batch.push(alice.post("from the future", minutes_ago(-60)));
        let reply = Post::reply("a reply", batch[0].key.clone());
        batch.push(alice.append(Content::Post(reply), minutes_ago(5)));
        view.db.index(&batch).unwrap();

        let page = view.db.recent_posts(3, None, false, false).unwrap();
        assert_eq!(page.len(), 3);
        assert!(page.windows(2).all(|w| w[0].claimed_at > w[1].claimed_at));
        assert!(page.iter().all(|e| e.is_root && e.text == "past"));

        let rest = view.db.recent_posts(10, Some(3), false, false).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(view.db.feed_count(&RecentPosts { want_private: false, only_followed: false }).unwrap(), 5);

        // private posts are a separate feed
        assert!(view.db.recent_posts(10, None, true, false).unwrap().is_empty());
    }

    #[test]
    fn test_hidden_posts_excluded_everywhere() {
        let view = open_view();
        let mut alice = FeedWriter::new(feed(20));
        let mut post = Post::new("tagged");
        post.mentions.push(Mention::hashtag("news"));
        let batch = vec![alice.append(Content::Post(post), minutes_ago(2))];
        view.db.index(&batch).unwrap();

        let strategies: Vec<Box<dyn FeedStrategy>> = vec![
            Box::new(RecentPosts { want_private: false, only_followed: false }),
            Box::new(GlobalPosts),
            Box::new(Discover),
            Box::new(HashtagPosts::new("#News")),
            Box::new(ProfilePosts::new(alice.author.clone())),
        ];
        for strategy in &strategies {
            assert_eq!(view.db.feed(strategy.as_ref(), 10, 0).unwrap().len(), 1, "{strategy:?}");
        }

        view.db.hide_all_from(&alice.author).unwrap();
        for strategy in &strategies {
            assert!(view.db.feed(strategy.as_ref(), 10, 0).unwrap().is_empty(), "{strategy:?}");
        }
    }

    #[test]
    fn test_discover_skips_followed_and_blocked() {
        let view = open_view();
        let mut me = FeedWriter::new(view.me.clone());
        let mut friend = FeedWriter::new(feed(20));
        let mut troll = FeedWriter::new(feed(21));
        let mut stranger = FeedWriter::new(feed(22));
        let batch = vec![
            me.append(Content::Contact(Contact::follow(friend.author.clone())), minutes_ago(60)),
            me.append(Content::Contact(Contact::block(troll.author.clone())), minutes_ago(59)),
            me.post("mine", minutes_ago(5)),
            friend.post("friend", minutes_ago(4)),
            troll.post("troll", minutes_ago(3)),
            stranger.post("stranger", minutes_ago(2)),
        ];
        view.db.index(&batch).unwrap();

        let found = view.db.feed(&Discover, 10, 0).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].author, stranger.author);

        let global = view.db.feed(&GlobalPosts, 10, 0).unwrap();
        assert!(global.iter().all(|e| e.author != troll.author));
        assert_eq!(global.len(), 3);
    }

    #[test]
    fn test_profile_feed_refuses_blocked() {
        let view = open_view();
        let mut me = FeedWriter::new(view.me.clone());
        let mut troll = FeedWriter::new(feed(21));
        let batch = vec![
            troll.post("hello", minutes_ago(3)),
            me.append(Content::Contact(Contact::block(troll.author.clone())), minutes_ago(2)),
        ];
        view.db.index(&batch).unwrap();

        assert!(matches!(
            view.db.feed_for(&troll.author, 10, 0),
            Err(StoreError::BlockedAuthor(_))
        ));
        assert!(view.db.feed_for(&feed(99), 10, 0).unwrap().is_empty());
    }
}
