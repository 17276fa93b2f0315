//! System relays ("stars") and their invite codes.
//!
//! An invite has the form `host:port:@key.ed25519~seed`. Redeeming it makes
//! the relay replicate the redeemer's feed.

use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::MultiserverAddress;
use crate::content::{PubAddress, PubAnnouncement};
use crate::error::{AddressError, InviteError};
use crate::types::FeedId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Star {
    invite: String,
    pub feed: FeedId,
    pub address: MultiserverAddress,
}

impl Star {
    pub fn invite(&self) -> &str {
        &self.invite
    }

    /// Address to gossip with once the invite is redeemed.
    pub fn to_peer(&self) -> MultiserverAddress {
        self.address.clone()
    }

    /// Record announcing this relay on the local feed.
    pub fn to_pub(&self) -> PubAnnouncement {
        PubAnnouncement {
            address: PubAddress {
                host: self.address.host.clone(),
                port: self.address.port,
                key: self.feed.clone(),
            },
        }
    }
}

impl FromStr for Star {
    type Err = InviteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invite = s.trim();
        let (location, _seed) = invite
            .split_once('~')
            .ok_or_else(|| InviteError::InvalidFormat(invite.to_string()))?;
        let (host_port, feed) = location
            .split_once(":@")
            .ok_or_else(|| InviteError::InvalidFormat(invite.to_string()))?;
        let feed: FeedId = format!("@{feed}").parse()?;

        let (host, port) = host_port
            .rsplit_once(':')
            .ok_or_else(|| AddressError::MissingPort(invite.to_string()))?;
        if host.is_empty() {
            return Err(AddressError::EmptyHost(invite.to_string()).into());
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressError::InvalidPort(invite.to_string()))?;

        let address = MultiserverAddress::net(host, port, feed.encoded());

        Ok(Self {
            invite: invite.to_string(),
            feed,
            address,
        })
    }
}

impl TryFrom<String> for Star {
    type Error = InviteError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Star> for String {
    fn from(star: Star) -> String {
        star.invite
    }
}

impl PartialEq for Star {
    fn eq(&self, other: &Self) -> bool {
        self.invite == other.invite
    }
}

impl Eq for Star {}

impl Hash for Star {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.invite.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "5KDK98cjIQ8bPoBkvp7bCwBXoQMlWpdIbCFyXER8Lbw=";

    fn invite() -> String {
        format!("one.planetary.pub:8008:@{KEY}.ed25519~aW52aXRlLXNlZWQ=")
    }

    #[test]
    fn test_parse_invite() {
        let star: Star = invite().parse().unwrap();
        assert_eq!(star.feed.encoded(), KEY);
        assert_eq!(star.address.host, "one.planetary.pub");
        assert_eq!(star.address.port, 8008);
        assert_eq!(
            star.to_peer().to_string(),
            format!("net:one.planetary.pub:8008~shs:{KEY}")
        );
        assert_eq!(star.invite(), invite());
    }

    #[test]
    fn test_pub_record_matches_address() {
        let star: Star = invite().parse().unwrap();
        let announcement = star.to_pub();
        assert_eq!(announcement.address.key, star.feed);
        assert_eq!(announcement.multiserver(), star.address);
    }

    #[test]
    fn test_rejects_missing_seed() {
        let raw = format!("one.planetary.pub:8008:@{KEY}.ed25519");
        assert!(matches!(raw.parse::<Star>(), Err(InviteError::InvalidFormat(_))));
    }

    #[test]
    fn test_rejects_bad_feed() {
        let raw = "one.planetary.pub:8008:@short.ed25519~seed";
        assert!(matches!(raw.parse::<Star>(), Err(InviteError::Identity(_))));
    }
}
