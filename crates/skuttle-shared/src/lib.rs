//! # skuttle-shared
//!
//! Types shared by every layer of the client: content-addressed references,
//! signed log entries with their typed payloads, relay addresses and invites.

pub mod address;
pub mod constants;
pub mod content;
pub mod error;
pub mod message;
pub mod star;
pub mod types;

pub use address::MultiserverAddress;
pub use content::{About, Contact, ContactState, Content, Mention, MentionTarget, Post, PubAnnouncement, Vote};
pub use error::{AddressError, IdentifierError, InviteError};
pub use message::{Message, RawMessage};
pub use star::Star;
pub use types::{BlobId, FeedId, MessageId};
