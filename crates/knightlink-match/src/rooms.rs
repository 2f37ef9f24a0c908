//! Rooms waiting for a friend, keyed by room code.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use knightlink_protocol::RoomCode;
use knightlink_transport::ConnectionId;

use crate::{Pairing, Peer};

/// One hosted code.
#[derive(Debug)]
struct Room {
    host: Peer,
    /// Other connections of the host's client that announced this code,
    /// oldest first. One takes over if the host goes away.
    standby: Vec<Peer>,
}

impl Room {
    fn new(host: Peer) -> Self {
        Self {
            host,
            standby: Vec::new(),
        }
    }

    /// Replaces a closed host with the oldest open standby. Returns `false`
    /// when nobody is left to host.
    fn ensure_open_host(&mut self) -> bool {
        if self.host.is_open() {
            return true;
        }
        self.standby.retain(Peer::is_open);
        if self.standby.is_empty() {
            return false;
        }
        self.host = self.standby.remove(0);
        true
    }
}

/// Registry of hosted rooms. At most one room, and one host, per code.
///
/// Any code is valid: announcing an unknown code creates the room, so
/// there is no "room not found".
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosts the room for `code`, or joins it if someone else is hosting.
    ///
    /// | room state | caller | result |
    /// |---|---|---|
    /// | absent, or host and standbys closed | any | caller hosts, `Waiting` |
    /// | open host | same connection | host refreshed, `Waiting` |
    /// | open host | same identity | caller stands by, `Waiting` |
    /// | open host | anyone else | room removed, host white, `Matched` |
    ///
    /// A closed host is first replaced by its oldest open standby.
    pub fn announce_or_join(&mut self, code: RoomCode, peer: Peer) -> Pairing {
        let mut slot = match self.rooms.entry(code) {
            Entry::Occupied(slot) => slot,
            Entry::Vacant(slot) => {
                tracing::debug!(room = %slot.key(), host = %peer.id(), "room created");
                slot.insert(Room::new(peer));
                return Pairing::Waiting;
            }
        };
        let code = slot.key().clone();
        let room = slot.get_mut();
        room.standby.retain(|p| p.id() != peer.id());

        if !room.ensure_open_host() {
            tracing::debug!(room = %code, host = %peer.id(), "room taken over");
            *room = Room::new(peer);
            return Pairing::Waiting;
        }
        if room.host.id() == peer.id() {
            room.host = peer;
            return Pairing::Waiting;
        }
        if room.host.identity().same_client(peer.identity()) {
            tracing::debug!(
                room = %code,
                host = %room.host.id(),
                standby = %peer.id(),
                "same identity re-announced room"
            );
            room.standby.push(peer);
            return Pairing::Waiting;
        }

        let room = slot.remove();
        Pairing::Matched {
            white: room.host,
            black: peer,
        }
    }

    /// Takes `id` out of the room for `code`, whether it hosts or stands by.
    ///
    /// When the host leaves, the oldest open standby becomes host and its id
    /// is returned. With nobody left the room is removed.
    pub fn leave(&mut self, code: &RoomCode, id: ConnectionId) -> Option<ConnectionId> {
        let room = self.rooms.get_mut(code)?;
        room.standby.retain(|p| p.id() != id);
        if room.host.id() != id {
            return None;
        }

        room.standby.retain(Peer::is_open);
        if room.standby.is_empty() {
            self.rooms.remove(code);
            tracing::debug!(room = %code, "room removed");
            return None;
        }
        room.host = room.standby.remove(0);
        tracing::debug!(room = %code, host = %room.host.id(), "standby promoted to host");
        Some(room.host.id())
    }

    /// Returns the connection currently hosting `code`.
    pub fn host_of(&self, code: &RoomCode) -> Option<ConnectionId> {
        self.rooms.get(code).map(|room| room.host.id())
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use knightlink_protocol::ClientIdentity;
    use tokio::sync::mpsc;

    fn peer(id: u64, identity: &str) -> (Peer, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = Peer::new(ConnectionId::new(id), ClientIdentity::new(identity), tx);
        (peer, rx)
    }

    fn code() -> RoomCode {
        RoomCode::new("ABC123")
    }

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[test]
    fn test_announce_or_join_creates_room() {
        let mut rooms = RoomRegistry::new();
        let (host, _rx) = peer(1, "u1");

        assert!(matches!(rooms.announce_or_join(code(), host), Pairing::Waiting));
        assert_eq!(rooms.host_of(&code()), Some(cid(1)));
    }

    #[test]
    fn test_announce_or_join_guest_matches_host_as_white() {
        let mut rooms = RoomRegistry::new();
        let (host, _rx_h) = peer(1, "u1");
        let (guest, _rx_g) = peer(2, "u2");

        rooms.announce_or_join(code(), host);
        match rooms.announce_or_join(code(), guest) {
            Pairing::Matched { white, black } => {
                assert_eq!(white.id(), cid(1));
                assert_eq!(black.id(), cid(2));
            }
            Pairing::Waiting => panic!("expected a match"),
        }
        assert!(rooms.is_empty(), "matched room should be removed");
    }

    #[test]
    fn test_announce_or_join_same_identity_keeps_original_host() {
        let mut rooms = RoomRegistry::new();
        let (host, _rx_h) = peer(1, "u1");
        let (dup, _rx_d) = peer(2, "u1");

        rooms.announce_or_join(code(), host);
        assert!(matches!(rooms.announce_or_join(code(), dup), Pairing::Waiting));
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms.host_of(&code()), Some(cid(1)));
    }

    #[test]
    fn test_leave_host_promotes_open_standby() {
        let mut rooms = RoomRegistry::new();
        let (host, rx_h) = peer(1, "u1");
        let (dup, _rx_d) = peer(2, "u1");
        let (guest, _rx_g) = peer(3, "u2");

        rooms.announce_or_join(code(), host);
        rooms.announce_or_join(code(), dup);
        drop(rx_h);

        assert_eq!(rooms.leave(&code(), cid(1)), Some(cid(2)));
        assert_eq!(rooms.host_of(&code()), Some(cid(2)));

        match rooms.announce_or_join(code(), guest) {
            Pairing::Matched { white, black } => {
                assert_eq!(white.id(), cid(2));
                assert_eq!(black.id(), cid(3));
            }
            Pairing::Waiting => panic!("guest should meet the promoted host"),
        }
    }

    #[test]
    fn test_announce_or_join_closed_host_falls_back_to_standby() {
        let mut rooms = RoomRegistry::new();
        let (host, rx_h) = peer(1, "u1");
        let (dup, _rx_d) = peer(2, "u1");
        let (guest, _rx_g) = peer(3, "u2");

        rooms.announce_or_join(code(), host);
        rooms.announce_or_join(code(), dup);
        drop(rx_h);

        // The close has not been reported yet; the standby still hosts.
        match rooms.announce_or_join(code(), guest) {
            Pairing::Matched { white, .. } => assert_eq!(white.id(), cid(2)),
            Pairing::Waiting => panic!("expected a match"),
        }
        assert!(rooms.leave(&code(), cid(1)).is_none());
    }

    #[test]
    fn test_leave_standby_keeps_host() {
        let mut rooms = RoomRegistry::new();
        let (host, _rx_h) = peer(1, "u1");
        let (dup, _rx_d) = peer(2, "u1");

        rooms.announce_or_join(code(), host);
        rooms.announce_or_join(code(), dup);

        assert!(rooms.leave(&code(), cid(2)).is_none());
        assert!(rooms.leave(&code(), cid(1)).is_none());
        assert!(rooms.is_empty(), "no standby left to promote");
    }

    #[test]
    fn test_announce_or_join_same_connection_is_idempotent() {
        let mut rooms = RoomRegistry::new();
        let (host, _rx) = peer(1, "");

        rooms.announce_or_join(code(), host.clone());
        assert!(matches!(rooms.announce_or_join(code(), host), Pairing::Waiting));
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn test_announce_or_join_closed_host_is_replaced() {
        let mut rooms = RoomRegistry::new();
        let (host, rx_h) = peer(1, "u1");
        let (next, _rx_n) = peer(2, "u2");

        rooms.announce_or_join(code(), host);
        drop(rx_h);

        assert!(matches!(rooms.announce_or_join(code(), next), Pairing::Waiting));
        assert_eq!(rooms.host_of(&code()), Some(cid(2)));
    }

    #[test]
    fn test_leave_ignores_non_member() {
        let mut rooms = RoomRegistry::new();
        let (host, _rx) = peer(1, "u1");
        rooms.announce_or_join(code(), host);

        assert!(rooms.leave(&code(), cid(9)).is_none());
        assert_eq!(rooms.len(), 1);
        assert!(rooms.leave(&code(), cid(1)).is_none());
        assert!(rooms.is_empty());
    }
}
