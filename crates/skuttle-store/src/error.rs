use skuttle_shared::MessageId;
use thiserror::Error;

/// Errors produced by the view store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A surrogate id has no backing row. Points at an indexing bug.
    #[error("Unknown reference id {0}")]
    UnknownReferenceId(i64),

    /// The message key was never indexed (possibly not replicated yet).
    #[error("Unknown message {0}")]
    UnknownMessage(MessageId),

    #[error("Unknown author {0}")]
    UnknownAuthor(String),

    #[error("Unexpected content type '{content_type}' in {key}")]
    UnexpectedContentType { key: MessageId, content_type: String },

    /// An entry skipped ahead of the feed's indexed head.
    #[error("Sequence gap in {author}: expected {expected}, got {got}")]
    SequenceGap {
        author: String,
        expected: i64,
        got: i64,
    },

    /// The current identity blocks the requested author.
    #[error("Author {0} is blocked")]
    BlockedAuthor(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Map "no rows" onto `NotFound`.
pub(crate) fn not_found(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}
