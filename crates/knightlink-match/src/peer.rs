//! A connection as the matchmaker sees it.

use knightlink_protocol::{ClientIdentity, Message, encode};
use knightlink_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel feeding a connection's writer task with outbound text frames.
///
/// Unbounded so that relaying never suspends the matchmaker on a slow
/// receiver. The writer task owns the receiving end; once it stops, the
/// channel reports closed and the peer counts as gone.
pub type Outbox = mpsc::UnboundedSender<String>;

/// A handle to one client connection: who it is and how to reach it.
///
/// Cloning a `Peer` is cheap and every clone reaches the same writer task.
#[derive(Debug, Clone)]
pub struct Peer {
    id: ConnectionId,
    identity: ClientIdentity,
    outbox: Outbox,
}

impl Peer {
    pub fn new(id: ConnectionId, identity: ClientIdentity, outbox: Outbox) -> Self {
        Self {
            id,
            identity,
            outbox,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Replaces the identity, e.g. when an in-band intent carries a
    /// `clientId`.
    pub fn set_identity(&mut self, identity: ClientIdentity) {
        self.identity = identity;
    }

    /// Returns `false` once the connection's writer task has stopped.
    pub fn is_open(&self) -> bool {
        !self.outbox.is_closed()
    }

    /// Encodes and queues a message. Returns `false` if the peer is gone.
    pub fn send(&self, message: &Message) -> bool {
        match encode(message) {
            Ok(frame) => self.send_frame(frame),
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "failed to encode message");
                false
            }
        }
    }

    /// Queues an already-encoded frame as-is.
    pub fn send_frame(&self, frame: impl Into<String>) -> bool {
        self.outbox.send(frame.into()).is_ok()
    }
}
