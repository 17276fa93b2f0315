//! v001 -- Initial view schema.
//!
//! Every content-addressed key is interned once into `authors` or
//! `messagekeys`; all other tables join on those integer ids.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Surrogate ids
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS authors (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    author TEXT UNIQUE NOT NULL                -- @<key>.ed25519
);

CREATE TABLE IF NOT EXISTS messagekeys (
    id  INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT UNIQUE NOT NULL                   -- %<hash>.sha256
);

-- Highest indexed sequence per feed, including entries skipped for age.
CREATE TABLE IF NOT EXISTS feed_heads (
    author_id INTEGER PRIMARY KEY NOT NULL,
    sequence  INTEGER NOT NULL,

    FOREIGN KEY (author_id) REFERENCES authors(id)
);

-- Highest receive-log position consumed, whether or not it was projected.
CREATE TABLE IF NOT EXISTS receive_cursor (
    id     INTEGER PRIMARY KEY CHECK (id = 0),
    rx_seq INTEGER NOT NULL
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    msg_id       INTEGER PRIMARY KEY NOT NULL, -- FK -> messagekeys(id)
    author_id    INTEGER NOT NULL,             -- FK -> authors(id)
    sequence     INTEGER NOT NULL,
    type         TEXT NOT NULL,
    received_at  INTEGER NOT NULL,             -- millis, local clock
    claimed_at   INTEGER NOT NULL,             -- millis, author asserted
    is_decrypted BOOLEAN NOT NULL DEFAULT 0,
    hidden       BOOLEAN NOT NULL DEFAULT 0,
    rx_seq       INTEGER,

    UNIQUE (author_id, sequence),
    FOREIGN KEY (msg_id) REFERENCES messagekeys(id),
    FOREIGN KEY (author_id) REFERENCES authors(id)
);

CREATE INDEX IF NOT EXISTS idx_messages_claimed ON messages(type, claimed_at DESC);
CREATE INDEX IF NOT EXISTS idx_messages_author ON messages(author_id, claimed_at DESC);
CREATE INDEX IF NOT EXISTS idx_messages_rx ON messages(rx_seq);

-- ----------------------------------------------------------------
-- Posts and their attachments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS posts (
    msg_ref INTEGER PRIMARY KEY NOT NULL,
    text    TEXT NOT NULL,
    is_root BOOLEAN NOT NULL DEFAULT 1,

    FOREIGN KEY (msg_ref) REFERENCES messages(msg_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS post_blobs (
    msg_ref                INTEGER NOT NULL,
    identifier             TEXT NOT NULL,  -- &<hash>.sha256
    name                   TEXT,
    meta_bytes             INTEGER,
    meta_width             INTEGER,
    meta_height            INTEGER,
    meta_mime_type         TEXT,
    meta_average_color_rgb INTEGER,

    FOREIGN KEY (msg_ref) REFERENCES messages(msg_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_post_blobs_msg ON post_blobs(msg_ref);

CREATE TABLE IF NOT EXISTS mention_feed (
    msg_ref INTEGER NOT NULL,
    feed_id INTEGER NOT NULL,
    name    TEXT,

    FOREIGN KEY (msg_ref) REFERENCES messages(msg_id) ON DELETE CASCADE,
    FOREIGN KEY (feed_id) REFERENCES authors(id)
);

CREATE INDEX IF NOT EXISTS idx_mention_feed_target ON mention_feed(feed_id);

CREATE TABLE IF NOT EXISTS mention_message (
    msg_ref INTEGER NOT NULL,
    link_id INTEGER NOT NULL,

    FOREIGN KEY (msg_ref) REFERENCES messages(msg_id) ON DELETE CASCADE,
    FOREIGN KEY (link_id) REFERENCES messagekeys(id)
);

-- ----------------------------------------------------------------
-- Votes
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS votes (
    msg_ref    INTEGER PRIMARY KEY NOT NULL,
    link_id    INTEGER NOT NULL,
    value      INTEGER NOT NULL,
    expression TEXT,

    FOREIGN KEY (msg_ref) REFERENCES messages(msg_id) ON DELETE CASCADE,
    FOREIGN KEY (link_id) REFERENCES messagekeys(id)
);

CREATE INDEX IF NOT EXISTS idx_votes_link ON votes(link_id);

-- ----------------------------------------------------------------
-- Threads
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS tangles (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    msg_ref INTEGER UNIQUE NOT NULL,
    root    INTEGER NOT NULL,

    FOREIGN KEY (msg_ref) REFERENCES messages(msg_id) ON DELETE CASCADE,
    FOREIGN KEY (root) REFERENCES messagekeys(id)
);

CREATE INDEX IF NOT EXISTS idx_tangles_root ON tangles(root);

CREATE TABLE IF NOT EXISTS branches (
    tangle_id INTEGER NOT NULL,
    branch    INTEGER NOT NULL,

    FOREIGN KEY (tangle_id) REFERENCES tangles(id) ON DELETE CASCADE,
    FOREIGN KEY (branch) REFERENCES messagekeys(id)
);

-- ----------------------------------------------------------------
-- Latest-wins projections
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS contacts (
    author_id  INTEGER NOT NULL,
    contact_id INTEGER NOT NULL,
    state      INTEGER NOT NULL DEFAULT 0,  -- 1 following, -1 blocking
    msg_ref    INTEGER NOT NULL,

    PRIMARY KEY (author_id, contact_id),
    FOREIGN KEY (author_id) REFERENCES authors(id),
    FOREIGN KEY (contact_id) REFERENCES authors(id),
    FOREIGN KEY (msg_ref) REFERENCES messages(msg_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_contacts_contact ON contacts(contact_id, state);

CREATE TABLE IF NOT EXISTS abouts (
    about_id           INTEGER PRIMARY KEY NOT NULL,
    msg_ref            INTEGER NOT NULL,
    name               TEXT,
    description        TEXT,
    image              TEXT,
    public_web_hosting BOOLEAN,

    FOREIGN KEY (about_id) REFERENCES authors(id),
    FOREIGN KEY (msg_ref) REFERENCES messages(msg_id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Hashtags
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS channels (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS channel_assignments (
    msg_ref  INTEGER NOT NULL,
    chan_ref INTEGER NOT NULL,

    PRIMARY KEY (msg_ref, chan_ref),
    FOREIGN KEY (msg_ref) REFERENCES messages(msg_id) ON DELETE CASCADE,
    FOREIGN KEY (chan_ref) REFERENCES channels(id)
);

-- ----------------------------------------------------------------
-- Relay addresses announced through `pub` messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS addresses (
    address_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    about_id    INTEGER NOT NULL,            -- relay identity
    announcer   INTEGER NOT NULL,            -- feed that published it
    address     TEXT UNIQUE NOT NULL,        -- net:host:port~shs:key
    worked_last INTEGER,                     -- millis
    last_err    TEXT,
    in_use      BOOLEAN NOT NULL DEFAULT 1,

    FOREIGN KEY (about_id) REFERENCES authors(id),
    FOREIGN KEY (announcer) REFERENCES authors(id)
);
"#;

/// Apply the v001 schema.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
