use skuttle_shared::FeedId;

use crate::database::ViewDatabase;
use crate::error::Result;
use crate::ids;
use crate::models::AboutRow;
use crate::posts::load_about;

impl ViewDatabase {
    /// Latest profile fields of `identity`, if any were published.
    pub fn about(&self, identity: &FeedId) -> Result<Option<AboutRow>> {
        self.read(|conn| match ids::known_author(conn, identity)? {
            Some(author_id) => load_about(conn, author_id),
            None => Ok(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{feed, minutes_ago, open_view, FeedWriter};
    use skuttle_shared::content::ImageLink;
    use skuttle_shared::{About, Content};

    #[test]
    fn test_about_fields_merge_latest_wins() {
        let view = open_view();
        let mut alice = FeedWriter::new(feed(50));
        let mut update = About::named(&alice.author, "alice");
        update.description = Some("first".into());
        let rename = About::named(&alice.author, "alicia");
        let mut avatar = About::named(&alice.author, "alicia");
        avatar.name = None;
        avatar.image = Some(ImageLink::Bare("&avatar.sha256".into()));

        let batch = vec![
            alice.append(Content::About(update), minutes_ago(10)),
            alice.append(Content::About(rename), minutes_ago(9)),
            alice.append(Content::About(avatar), minutes_ago(8)),
        ];
        view.db.index(&batch).unwrap();

        let about = view.db.about(&alice.author).unwrap().unwrap();
        assert_eq!(about.name.as_deref(), Some("alicia"));
        assert_eq!(about.description.as_deref(), Some("first"));
        assert_eq!(about.image.as_deref(), Some("&avatar.sha256"));
        assert_eq!(view.db.table_counts().unwrap().abouts, 1);
    }

    #[test]
    fn test_about_by_other_author_applies_to_subject() {
        let view = open_view();
        let mut alice = FeedWriter::new(feed(50));
        let bob = feed(51);
        let batch = vec![alice.append(Content::About(About::named(&bob, "bobby")), minutes_ago(1))];
        view.db.index(&batch).unwrap();

        assert_eq!(view.db.about(&bob).unwrap().unwrap().name.as_deref(), Some("bobby"));
        assert!(view.db.about(&alice.author).unwrap().is_none());
        assert!(view.db.about(&feed(99)).unwrap().is_none());
    }
}
