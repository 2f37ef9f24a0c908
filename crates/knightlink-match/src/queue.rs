//! The random-opponent waiting list.

use std::collections::VecDeque;

use knightlink_transport::ConnectionId;

use crate::Peer;

/// Result of asking a matcher for an opponent.
#[derive(Debug)]
pub enum Pairing {
    /// No compatible opponent yet; the caller is now waiting.
    Waiting,
    /// Two peers were paired. The one that was already waiting plays white.
    Matched { white: Peer, black: Peer },
}

/// FIFO queue of clients seeking any opponent.
///
/// Entries whose connection has closed are purged lazily, on the next
/// request. A client is never paired with another connection carrying the
/// same non-empty identity (its own stale tab, or a reconnect racing the
/// old socket); both simply stay queued.
#[derive(Debug, Default)]
pub struct RandomQueue {
    entries: VecDeque<Peer>,
}

impl RandomQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs `peer` with the oldest compatible waiting entry, or queues it.
    ///
    /// A connection that is already queued keeps its position; only its
    /// identity is refreshed.
    pub fn request_random_match(&mut self, peer: Peer) -> Pairing {
        self.entries.retain(Peer::is_open);

        let own_slot = self.entries.iter().position(|e| e.id() == peer.id());
        if let Some(slot) = own_slot {
            self.entries.remove(slot);
        }

        let opponent = self
            .entries
            .iter()
            .position(|e| !e.identity().same_client(peer.identity()));

        if let Some(white) = opponent.and_then(|i| self.entries.remove(i)) {
            tracing::debug!(white = %white.id(), black = %peer.id(), "random pair found");
            return Pairing::Matched { white, black: peer };
        }

        match own_slot {
            Some(slot) => self.entries.insert(slot, peer),
            None => self.entries.push_back(peer),
        }
        Pairing::Waiting
    }

    /// Removes a waiting connection. Returns `true` if it was queued.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id() != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries.iter().any(|e| e.id() == id)
    }

    /// Number of entries, including closed ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
