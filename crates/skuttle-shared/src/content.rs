//! Typed message payloads.
//!
//! Payloads arrive as loosely typed JSON tagged by a `type` field. They are
//! resolved once, at the ingestion boundary, into the closed [`Content`] sum
//! type; everything downstream matches on it exhaustively.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::MultiserverAddress;
use crate::types::{BlobId, FeedId, MessageId};

/// Tag carried by payloads that could not be read as JSON objects
/// (boxed private messages that were not decrypted).
pub const ENCRYPTED_TAG: &str = "encrypted";

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Post(Post),
    Contact(Contact),
    Vote(Vote),
    About(About),
    Pub(PubAnnouncement),
    /// A tag this client cannot project, or a known tag with a malformed body.
    Unknown { content_type: String },
}

impl Content {
    /// Resolve a raw payload into its typed form.
    pub fn from_json(value: &Value) -> Self {
        let Some(tag) = value.get("type").and_then(Value::as_str) else {
            let content_type = if value.is_string() {
                ENCRYPTED_TAG.to_string()
            } else {
                String::new()
            };
            return Content::Unknown { content_type };
        };

        let parsed = match tag {
            "post" => serde_json::from_value(value.clone()).map(Content::Post),
            "contact" => serde_json::from_value(value.clone()).map(Content::Contact),
            "vote" => serde_json::from_value(value.clone()).map(Content::Vote),
            "about" => serde_json::from_value(value.clone()).map(Content::About),
            "pub" => serde_json::from_value(value.clone()).map(Content::Pub),
            other => {
                return Content::Unknown {
                    content_type: other.to_string(),
                }
            }
        };

        parsed.unwrap_or_else(|_| Content::Unknown {
            content_type: tag.to_string(),
        })
    }

    /// Encode the payload for publishing. Unknown payloads encode to `null`.
    pub fn to_json(&self) -> Value {
        let (tag, body) = match self {
            Content::Post(p) => ("post", serde_json::to_value(p)),
            Content::Contact(c) => ("contact", serde_json::to_value(c)),
            Content::Vote(v) => ("vote", serde_json::to_value(v)),
            Content::About(a) => ("about", serde_json::to_value(a)),
            Content::Pub(p) => ("pub", serde_json::to_value(p)),
            Content::Unknown { .. } => return Value::Null,
        };
        match body {
            Ok(Value::Object(mut map)) => {
                map.insert("type".to_string(), Value::String(tag.to_string()));
                Value::Object(map)
            }
            _ => Value::Null,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Content::Post(_) => "post",
            Content::Contact(_) => "contact",
            Content::Vote(_) => "vote",
            Content::About(_) => "about",
            Content::Pub(_) => "pub",
            Content::Unknown { content_type } => content_type,
        }
    }
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub branch: Vec<MessageId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<Mention>,
}

impl Post {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            root: None,
            branch: Vec::new(),
            mentions: Vec::new(),
        }
    }

    pub fn reply(text: impl Into<String>, root: MessageId) -> Self {
        Self {
            text: text.into(),
            branch: vec![root.clone()],
            root: Some(root),
            mentions: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.root.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: i64,
    pub height: i64,
}

/// A link embedded in a post: a feed, a message, a blob or a hashtag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(
        rename = "averageColorRGB",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub average_color_rgb: Option<i64>,
}

/// What a mention points at, once its link has been validated.
#[derive(Debug, Clone, PartialEq)]
pub enum MentionTarget {
    Feed(FeedId),
    Message(MessageId),
    Blob(BlobId),
    Hashtag(String),
    Invalid,
}

impl Mention {
    pub fn feed(feed: &FeedId, name: impl Into<String>) -> Self {
        Self::link(feed.to_string(), Some(name.into()))
    }

    pub fn message(msg: &MessageId) -> Self {
        Self::link(msg.to_string(), None)
    }

    pub fn hashtag(tag: &str) -> Self {
        Self::link(format!("#{}", tag.trim_start_matches('#')), None)
    }

    pub fn image(blob: &BlobId, mime_type: &str, dimensions: Option<Dimensions>) -> Self {
        Self {
            mime_type: Some(mime_type.to_string()),
            dimensions,
            ..Self::link(blob.to_string(), None)
        }
    }

    fn link(link: String, name: Option<String>) -> Self {
        Self {
            link,
            name,
            mime_type: None,
            size: None,
            dimensions: None,
            average_color_rgb: None,
        }
    }

    pub fn target(&self) -> MentionTarget {
        let link = self.link.as_str();
        match link.chars().next() {
            Some('@') => link.parse().map(MentionTarget::Feed).unwrap_or(MentionTarget::Invalid),
            Some('%') => link.parse().map(MentionTarget::Message).unwrap_or(MentionTarget::Invalid),
            Some('&') => link.parse().map(MentionTarget::Blob).unwrap_or(MentionTarget::Invalid),
            Some('#') if link.len() > 1 => MentionTarget::Hashtag(link[1..].to_lowercase()),
            _ => MentionTarget::Invalid,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with("image/"))
    }
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub contact: FeedId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking: Option<bool>,
}

/// Latest relationship of one identity towards another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactState {
    None,
    Following,
    Blocking,
}

impl ContactState {
    pub fn as_i64(self) -> i64 {
        match self {
            ContactState::None => 0,
            ContactState::Following => 1,
            ContactState::Blocking => -1,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => ContactState::Following,
            -1 => ContactState::Blocking,
            _ => ContactState::None,
        }
    }
}

impl Contact {
    pub fn follow(contact: FeedId) -> Self {
        Self {
            contact,
            following: Some(true),
            blocking: None,
        }
    }

    pub fn unfollow(contact: FeedId) -> Self {
        Self {
            contact,
            following: Some(false),
            blocking: None,
        }
    }

    pub fn block(contact: FeedId) -> Self {
        Self {
            contact,
            following: None,
            blocking: Some(true),
        }
    }

    /// `None` when the message claims both following and blocking.
    pub fn state(&self) -> Option<ContactState> {
        match (self.following.unwrap_or(false), self.blocking.unwrap_or(false)) {
            (true, true) => None,
            (true, false) => Some(ContactState::Following),
            (false, true) => Some(ContactState::Blocking),
            (false, false) => Some(ContactState::None),
        }
    }
}

// ---------------------------------------------------------------------------
// Vote
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteLink {
    pub link: MessageId,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub vote: VoteLink,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub branch: Vec<MessageId>,
}

// ---------------------------------------------------------------------------
// About
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageLink {
    Bare(String),
    Linked { link: String },
}

impl ImageLink {
    pub fn link(&self) -> &str {
        match self {
            ImageLink::Bare(link) => link,
            ImageLink::Linked { link } => link,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct About {
    /// Subject of the profile update; usually a feed, sometimes a message.
    pub about: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_web_hosting: Option<bool>,
}

impl About {
    pub fn named(subject: &FeedId, name: impl Into<String>) -> Self {
        Self {
            about: subject.to_string(),
            name: Some(name.into()),
            description: None,
            image: None,
            public_web_hosting: None,
        }
    }

    pub fn subject_feed(&self) -> Option<FeedId> {
        self.about.parse().ok()
    }
}

// ---------------------------------------------------------------------------
// Pub
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubAddress {
    pub host: String,
    pub port: u16,
    pub key: FeedId,
}

/// Announcement that a relay can be reached at an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubAnnouncement {
    pub address: PubAddress,
}

impl PubAnnouncement {
    pub fn multiserver(&self) -> MultiserverAddress {
        MultiserverAddress::net(
            &self.address.host,
            self.address.port,
            self.address.key.encoded(),
        )
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<MessageId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(MessageId),
        Many(Vec<MessageId>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(id)) => vec![id],
        Some(OneOrMany::Many(ids)) => ids,
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feed(n: u8) -> FeedId {
        FeedId::from_bytes(&[n; 32])
    }

    #[test]
    fn test_post_dispatch() {
        let root = MessageId::from_bytes(&[1; 32]);
        let value = json!({
            "type": "post",
            "text": "hello",
            "root": root.to_string(),
            "branch": root.to_string(),
        });
        match Content::from_json(&value) {
            Content::Post(post) => {
                assert_eq!(post.text, "hello");
                assert_eq!(post.root, Some(root.clone()));
                assert_eq!(post.branch, vec![root]);
                assert!(!post.is_root());
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag() {
        let value = json!({ "type": "gathering", "title": "x" });
        assert_eq!(
            Content::from_json(&value),
            Content::Unknown {
                content_type: "gathering".into()
            }
        );
    }

    #[test]
    fn test_boxed_payload_is_unknown() {
        let value = json!("c2VjcmV0.box");
        assert_eq!(Content::from_json(&value).type_name(), ENCRYPTED_TAG);
    }

    #[test]
    fn test_malformed_contact_is_unknown() {
        let value = json!({ "type": "contact", "contact": "not-a-feed" });
        assert!(matches!(Content::from_json(&value), Content::Unknown { .. }));
    }

    #[test]
    fn test_contact_state() {
        assert_eq!(Contact::follow(feed(1)).state(), Some(ContactState::Following));
        assert_eq!(Contact::unfollow(feed(1)).state(), Some(ContactState::None));
        assert_eq!(Contact::block(feed(1)).state(), Some(ContactState::Blocking));
        let broken = Contact {
            contact: feed(1),
            following: Some(true),
            blocking: Some(true),
        };
        assert_eq!(broken.state(), None);
    }

    #[test]
    fn test_to_json_carries_type() {
        let content = Content::Contact(Contact::follow(feed(2)));
        let value = content.to_json();
        assert_eq!(value["type"], "contact");
        assert_eq!(value["following"], true);
        assert_eq!(Content::from_json(&value), content);
    }

    #[test]
    fn test_about_image_forms() {
        let bare = json!({ "type": "about", "about": feed(3).to_string(), "image": "&abc" });
        let linked = json!({ "type": "about", "about": feed(3).to_string(), "image": { "link": "&abc" } });
        for value in [bare, linked] {
            match Content::from_json(&value) {
                Content::About(about) => assert_eq!(about.image.unwrap().link(), "&abc"),
                other => panic!("unexpected content {other:?}"),
            }
        }
    }

    #[test]
    fn test_mention_targets() {
        let blob = BlobId::from_bytes(&[5; 32]);
        assert!(matches!(Mention::feed(&feed(1), "bob").target(), MentionTarget::Feed(_)));
        assert_eq!(Mention::hashtag("#Rust").target(), MentionTarget::Hashtag("rust".into()));
        assert!(Mention::image(&blob, "image/png", None).is_image());
        let bogus = Mention::hashtag("x");
        let bogus = Mention { link: "nonsense".into(), ..bogus };
        assert_eq!(bogus.target(), MentionTarget::Invalid);
    }
}
