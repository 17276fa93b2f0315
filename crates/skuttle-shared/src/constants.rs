/// Application name
pub const APP_NAME: &str = "Skuttle";

/// Key suffix of a classic ed25519 feed reference
pub const FEED_SUFFIX: &str = "ed25519";

/// Hash suffix of message and blob references
pub const HASH_SUFFIX: &str = "sha256";

/// Raw key / hash length behind every reference (bytes)
pub const REF_BYTES: usize = 32;

/// Address scheme announced for TCP relays
pub const NET_SCHEME: &str = "net";

/// Secret-handshake marker separating host/port from the relay key
pub const SHS_MARKER: &str = "~shs:";

/// Default gossip port of a relay
pub const DEFAULT_RELAY_PORT: u16 = 8008;

/// Minimum number of system relays a client keeps invites for
pub const MIN_NUMBER_OF_STARS: usize = 3;

/// Entries claimed older than this are not indexed (six months, millis)
pub const DEFAULT_MAX_AGE_MS: i64 = 1000 * 60 * 60 * 24 * 30 * 6;

/// Number of sample repliers attached to a feed entry
pub const REPLY_SAMPLE_SIZE: usize = 3;
