//! The symmetric relay between two paired connections.

use std::collections::HashMap;

use knightlink_protocol::{Message, SessionKind};
use knightlink_transport::ConnectionId;

use crate::{MatchError, Peer};

/// One direction of a mapping: who to forward to, and how the session was
/// formed.
#[derive(Debug)]
struct Link {
    partner: Peer,
    kind: SessionKind,
}

/// Peer mappings {A↔B}. Each connection appears in at most one mapping and
/// both directions are always inserted and removed together.
#[derive(Debug, Default)]
pub struct PeerLinks {
    links: HashMap<ConnectionId, Link>,
}

impl PeerLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds two connections into a session.
    ///
    /// # Errors
    /// [`MatchError::AlreadyLinked`] if either side is already in a session
    /// or both sides are the same connection.
    pub fn wire(&mut self, a: Peer, b: Peer, kind: SessionKind) -> Result<(), MatchError> {
        for id in [a.id(), b.id()] {
            if self.links.contains_key(&id) {
                return Err(MatchError::AlreadyLinked(id));
            }
        }
        if a.id() == b.id() {
            return Err(MatchError::AlreadyLinked(a.id()));
        }

        self.links.insert(a.id(), Link { partner: b.clone(), kind });
        self.links.insert(b.id(), Link { partner: a, kind });
        Ok(())
    }

    /// Forwards `frame` verbatim to the partner of `from`.
    ///
    /// Only relayed message types pass; broadcast types are also echoed to
    /// the sender. Returns `false` if the message was dropped.
    pub fn relay(&self, from: ConnectionId, message: &Message, frame: &str) -> bool {
        if !message.is_relayed() {
            return false;
        }
        let Some(link) = self.links.get(&from) else {
            return false;
        };

        link.partner.send_frame(frame);
        if message.is_broadcast() {
            if let Some(back) = self.links.get(&link.partner.id()) {
                back.partner.send_frame(frame);
            }
        }
        true
    }

    /// Tears down the session `id` belongs to.
    ///
    /// The survivor, if still open, gets exactly one peer-left notification.
    /// Returns the survivor's id, or `None` if `id` was not linked, so a
    /// second close is a no-op.
    pub fn close(&mut self, id: ConnectionId) -> Option<ConnectionId> {
        let link = self.links.remove(&id)?;
        let survivor = link.partner.id();
        self.links.remove(&survivor);

        if link.partner.is_open() {
            link.partner.send(&link.kind.peer_left_message());
        }
        tracing::info!(closed = %id, %survivor, kind = %link.kind, "session ended");
        Some(survivor)
    }

    pub fn partner_of(&self, id: ConnectionId) -> Option<ConnectionId> {
        self.links.get(&id).map(|link| link.partner.id())
    }

    pub fn is_linked(&self, id: ConnectionId) -> bool {
        self.links.contains_key(&id)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.links.len() / 2
    }
}
