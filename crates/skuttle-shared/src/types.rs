//! Content-addressed references used across the log.
//!
//! Every reference is a sigil, a base64 encoded 32-byte key or hash and a
//! suffix naming the algorithm: `@<key>.ed25519` for feeds, `%<hash>.sha256`
//! for messages and `&<hash>.sha256` for blobs.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::constants::{FEED_SUFFIX, HASH_SUFFIX, REF_BYTES};
use crate::error::IdentifierError;

fn validate(value: &str, sigil: char, suffix: &str) -> Result<(), IdentifierError> {
    let Some(body) = value.strip_prefix(sigil) else {
        return Err(IdentifierError::InvalidSigil {
            expected: sigil,
            value: value.to_string(),
        });
    };

    let Some((encoded, found_suffix)) = body.rsplit_once('.') else {
        return Err(IdentifierError::InvalidSuffix(value.to_string()));
    };
    if found_suffix != suffix {
        return Err(IdentifierError::InvalidSuffix(value.to_string()));
    }

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|_| IdentifierError::InvalidEncoding(value.to_string()))?;
    if bytes.len() != REF_BYTES {
        return Err(IdentifierError::InvalidLength(value.to_string()));
    }
    Ok(())
}

macro_rules! reference {
    ($(#[$meta:meta])* $name:ident, $sigil:expr, $suffix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub const SIGIL: char = $sigil;

            /// Build a reference from the raw 32 bytes behind it.
            pub fn from_bytes(bytes: &[u8; REF_BYTES]) -> Self {
                Self(format!("{}{}.{}", $sigil, STANDARD.encode(bytes), $suffix))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The base64 payload without sigil and suffix.
            pub fn encoded(&self) -> &str {
                let body = &self.0[$sigil.len_utf8()..];
                body.rsplit_once('.').map(|(enc, _)| enc).unwrap_or(body)
            }

            pub fn short(&self) -> String {
                self.0.chars().take(8).collect()
            }
        }

        impl FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                validate(s, $sigil, $suffix)?;
                Ok(Self(s.to_string()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdentifierError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                validate(&s, $sigil, $suffix)?;
                Ok(Self(s))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

reference!(
    /// Identity of a feed: the author's ed25519 public key.
    FeedId,
    '@',
    FEED_SUFFIX
);

reference!(
    /// Hash of a signed log entry.
    MessageId,
    '%',
    HASH_SUFFIX
);

reference!(
    /// Hash of an attachment stored out of band.
    BlobId,
    '&',
    HASH_SUFFIX
);

impl FeedId {
    /// Build a feed reference from the bare base64 key used in relay addresses.
    pub fn from_encoded_key(key: &str) -> Result<Self, IdentifierError> {
        format!("@{key}.{FEED_SUFFIX}").parse()
    }
}
