//! Multiserver addresses of the form `net:host:port~shs:key`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{NET_SCHEME, SHS_MARKER};
use crate::error::{AddressError, IdentifierError};
use crate::types::FeedId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MultiserverAddress {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Base64 public key of the relay, without sigil or suffix.
    pub key: String,
}

impl MultiserverAddress {
    pub fn net(host: &str, port: u16, key: &str) -> Self {
        Self {
            scheme: NET_SCHEME.to_string(),
            host: host.to_string(),
            port,
            key: key.to_string(),
        }
    }

    /// Feed identity of the relay behind this address.
    pub fn feed(&self) -> Result<FeedId, IdentifierError> {
        FeedId::from_encoded_key(&self.key)
    }
}

impl FromStr for MultiserverAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (location, key) = s
            .split_once(SHS_MARKER)
            .ok_or_else(|| AddressError::MissingKey(s.to_string()))?;
        if key.is_empty() {
            return Err(AddressError::MissingKey(s.to_string()));
        }

        let (scheme, host_port) = location
            .split_once(':')
            .ok_or_else(|| AddressError::MissingScheme(s.to_string()))?;
        if scheme.is_empty() {
            return Err(AddressError::MissingScheme(s.to_string()));
        }

        let (host, port) = host_port
            .rsplit_once(':')
            .ok_or_else(|| AddressError::MissingPort(s.to_string()))?;
        if host.is_empty() {
            return Err(AddressError::EmptyHost(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressError::InvalidPort(s.to_string()))?;

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            key: key.to_string(),
        })
    }
}

impl TryFrom<String> for MultiserverAddress {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MultiserverAddress> for String {
    fn from(addr: MultiserverAddress) -> String {
        addr.to_string()
    }
}

impl fmt::Display for MultiserverAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}{}{}",
            self.scheme, self.host, self.port, SHS_MARKER, self.key
        )
    }
}
