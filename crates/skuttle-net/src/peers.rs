//! Peer connection tracking.
//!
//! Keeps the set of peers seen open by the previous poll of the log store
//! and turns each new poll into a list of opened and closed connections.

use std::collections::HashMap;

use skuttle_shared::MultiserverAddress;
use tracing::debug;

/// Information about a connected peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub address: MultiserverAddress,
    /// When the connection was first observed (Unix epoch millis).
    pub connected_at: u64,
}

/// Connection transitions between two polls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerDiff {
    pub opened: Vec<MultiserverAddress>,
    pub closed: Vec<MultiserverAddress>,
}

impl PeerDiff {
    pub fn is_empty(&self) -> bool {
        self.opened.is_empty() && self.closed.is_empty()
    }
}

/// Tracks all currently connected peers.
#[derive(Debug, Clone, Default)]
pub struct PeerTracker {
    peers: HashMap<MultiserverAddress, ConnectionInfo>,
}

impl PeerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly connected peer.
    pub fn on_connected(&mut self, address: MultiserverAddress) -> bool {
        if self.peers.contains_key(&address) {
            return false;
        }
        debug!(addr = %address, "Tracking new peer connection");
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let info = ConnectionInfo {
            address: address.clone(),
            connected_at: now,
        };
        self.peers.insert(address, info);
        true
    }

    /// Remove a peer that has disconnected.
    pub fn on_disconnected(&mut self, address: &MultiserverAddress) -> bool {
        let removed = self.peers.remove(address).is_some();
        if removed {
            debug!(addr = %address, "Removed peer from tracker");
        }
        removed
    }

    /// Replace the tracked set with `open` and report what changed.
    pub fn observe(&mut self, open: &[MultiserverAddress]) -> PeerDiff {
        let mut diff = PeerDiff::default();

        let closed: Vec<MultiserverAddress> = self
            .peers
            .keys()
            .filter(|address| !open.contains(address))
            .cloned()
            .collect();
        for address in closed {
            self.on_disconnected(&address);
            diff.closed.push(address);
        }

        for address in open {
            if self.on_connected(address.clone()) {
                diff.opened.push(address.clone());
            }
        }

        diff
    }

    pub fn get(&self, address: &MultiserverAddress) -> Option<&ConnectionInfo> {
        self.peers.get(address)
    }

    pub fn is_connected(&self, address: &MultiserverAddress) -> bool {
        self.peers.contains_key(address)
    }

    pub fn connected_peers(&self) -> Vec<MultiserverAddress> {
        self.peers.keys().cloned().collect()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "5KDK98cjIQ8bPoBkvp7bCwBXoQMlWpdIbCFyXER8Lbw=";

    fn addr(host: &str) -> MultiserverAddress {
        MultiserverAddress::net(host, 8008, KEY)
    }

    #[test]
    fn test_connect_disconnect() {
        let mut tracker = PeerTracker::new();
        let peer = addr("10.0.0.1");

        assert!(!tracker.is_connected(&peer));
        assert!(tracker.on_connected(peer.clone()));
        assert!(!tracker.on_connected(peer.clone()));
        assert_eq!(tracker.peer_count(), 1);
        assert_eq!(tracker.get(&peer).map(|info| &info.address), Some(&peer));

        assert!(tracker.on_disconnected(&peer));
        assert!(!tracker.on_disconnected(&peer));
        assert_eq!(tracker.peer_count(), 0);
    }

    #[test]
    fn test_observe_reports_transitions() {
        let mut tracker = PeerTracker::new();
        let (a, b, c) = (addr("10.0.0.1"), addr("10.0.0.2"), addr("10.0.0.3"));

        let first = tracker.observe(&[a.clone(), b.clone()]);
        assert_eq!(first.opened.len(), 2);
        assert!(first.closed.is_empty());

        let second = tracker.observe(&[b.clone(), c.clone()]);
        assert_eq!(second.opened, vec![c.clone()]);
        assert_eq!(second.closed, vec![a.clone()]);

        assert!(tracker.observe(&[b.clone(), c.clone()]).is_empty());

        let mut peers = tracker.connected_peers();
        peers.sort_by(|x, y| x.host.cmp(&y.host));
        assert_eq!(peers, vec![b, c]);
    }

    #[test]
    fn test_observe_empty_closes_everything() {
        let mut tracker = PeerTracker::new();
        tracker.observe(&[addr("10.0.0.1")]);
        let diff = tracker.observe(&[]);
        assert_eq!(diff.closed.len(), 1);
        assert_eq!(tracker.peer_count(), 0);
    }
}
