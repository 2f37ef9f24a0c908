//! Matchmaker actor: the single owner of every waiting list and relay.
//!
//! The random queue, the room registry and the peer mappings all live in one
//! Tokio task. Connection handlers never touch them directly; they send a
//! command through a [`MatchmakerHandle`] and, where an answer is needed,
//! wait on a oneshot reply channel. Because one task processes commands in
//! order, "match or enqueue" decisions are atomic without any locks.
//!
//! Each connection moves through an explicit lifecycle:
//!
//! ```text
//! Open ──► Queued / Hosting / Standby ──► Relaying ──► Ended
//!   ▲                  │
//!   └──────────────────┘   (re-announce a different intent)
//! ```
//!
//! `Standby` is a second connection of a hosting client that announced the
//! same code, typically a reconnect racing the old socket. It is promoted
//! to `Hosting` when the host goes away.
//!
//! Detaching (the connection closed) is valid from any phase and removes the
//! connection from whichever structure its phase names.

use std::collections::HashMap;

use knightlink_protocol::{ClientIdentity, Color, Message, RoomCode, SessionKind};
use knightlink_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{
    MatchError, MatchmakerConfig, Pairing, Peer, PeerLinks, RandomQueue,
    RoomRegistry,
};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Attached, no intent yet.
    Open,
    /// Waiting in the random queue.
    Queued,
    /// Hosting the room with this code.
    Hosting(RoomCode),
    /// Waiting to take over the room with this code from a connection of
    /// the same client.
    Standby(RoomCode),
    /// Paired and relaying.
    Relaying(SessionKind),
    /// The peer left. The connection stays open but gets no new match.
    Ended,
}

/// What the caller of a match request got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Queued or hosting; a waiting reply was sent.
    Waiting,
    /// Paired immediately; the caller plays this color.
    Matched(Color),
}

/// A snapshot of matchmaker bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchmakerStats {
    /// Attached connections.
    pub connections: usize,
    /// Random-queue entries, including closed ones not yet purged.
    pub queued: usize,
    /// Rooms waiting for a friend.
    pub rooms: usize,
    /// Live two-party sessions.
    pub sessions: usize,
}

// ---------------------------------------------------------------------------
// Commands and handle
// ---------------------------------------------------------------------------

enum Command {
    Attach {
        peer: Peer,
        reply: oneshot::Sender<Result<(), MatchError>>,
    },
    RequestRandom {
        id: ConnectionId,
        identity: Option<ClientIdentity>,
        reply: oneshot::Sender<Result<MatchOutcome, MatchError>>,
    },
    AnnounceOrJoin {
        id: ConnectionId,
        code: RoomCode,
        identity: Option<ClientIdentity>,
        reply: oneshot::Sender<Result<MatchOutcome, MatchError>>,
    },
    Forward {
        id: ConnectionId,
        message: Message,
        frame: String,
    },
    Detach {
        id: ConnectionId,
    },
    Stats {
        reply: oneshot::Sender<MatchmakerStats>,
    },
    Phase {
        id: ConnectionId,
        reply: oneshot::Sender<Option<Phase>>,
    },
    Shutdown,
}

/// Handle to the running matchmaker. Cheap to clone.
#[derive(Clone)]
pub struct MatchmakerHandle {
    sender: mpsc::Sender<Command>,
}

impl MatchmakerHandle {
    /// Registers a connection. Must precede any other call for its id.
    pub async fn attach(&self, peer: Peer) -> Result<(), MatchError> {
        self.call(|reply| Command::Attach { peer, reply }).await?
    }

    /// Asks for a random opponent. `identity`, if given, replaces the
    /// connection's identity first.
    pub async fn request_random(
        &self,
        id: ConnectionId,
        identity: Option<ClientIdentity>,
    ) -> Result<MatchOutcome, MatchError> {
        self.call(|reply| Command::RequestRandom {
            id,
            identity,
            reply,
        })
        .await?
    }

    /// Hosts or joins the room `code`.
    pub async fn announce_or_join(
        &self,
        id: ConnectionId,
        code: RoomCode,
        identity: Option<ClientIdentity>,
    ) -> Result<MatchOutcome, MatchError> {
        self.call(|reply| Command::AnnounceOrJoin {
            id,
            code,
            identity,
            reply,
        })
        .await?
    }

    /// Hands an inbound frame to the peer link (fire-and-forget).
    ///
    /// `frame` is forwarded as received; `message` is its decoded form, used
    /// only to decide whether it may pass.
    pub async fn forward(
        &self,
        id: ConnectionId,
        message: Message,
        frame: String,
    ) -> Result<(), MatchError> {
        self.sender
            .send(Command::Forward { id, message, frame })
            .await
            .map_err(|_| MatchError::Unavailable)
    }

    /// Reports that a connection closed (fire-and-forget, idempotent).
    pub async fn detach(&self, id: ConnectionId) -> Result<(), MatchError> {
        self.sender
            .send(Command::Detach { id })
            .await
            .map_err(|_| MatchError::Unavailable)
    }

    pub async fn stats(&self) -> Result<MatchmakerStats, MatchError> {
        self.call(|reply| Command::Stats { reply }).await
    }

    /// Returns the lifecycle phase of a connection, or `None` if it is not
    /// attached.
    pub async fn phase(&self, id: ConnectionId) -> Result<Option<Phase>, MatchError> {
        self.call(|reply| Command::Phase { id, reply }).await
    }

    /// Stops the actor. Every outbox it holds is dropped, which lets the
    /// writer tasks close their connections.
    pub async fn shutdown(&self) -> Result<(), MatchError> {
        self.sender
            .send(Command::Shutdown)
            .await
            .map_err(|_| MatchError::Unavailable)
    }

    /// Sends a command carrying a reply channel and waits for the answer.
    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, MatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| MatchError::Unavailable)?;
        reply_rx.await.map_err(|_| MatchError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Tracked {
    peer: Peer,
    phase: Phase,
}

struct Matchmaker {
    connections: HashMap<ConnectionId, Tracked>,
    queue: RandomQueue,
    rooms: RoomRegistry,
    links: PeerLinks,
    receiver: mpsc::Receiver<Command>,
}

impl Matchmaker {
    async fn run(mut self) {
        tracing::info!("matchmaker started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                Command::Attach { peer, reply } => {
                    let _ = reply.send(self.handle_attach(peer));
                }
                Command::RequestRandom {
                    id,
                    identity,
                    reply,
                } => {
                    let _ = reply.send(self.handle_request_random(id, identity));
                }
                Command::AnnounceOrJoin {
                    id,
                    code,
                    identity,
                    reply,
                } => {
                    let result = self.handle_announce_or_join(id, code, identity);
                    let _ = reply.send(result);
                }
                Command::Forward { id, message, frame } => {
                    if !self.links.relay(id, &message, &frame) {
                        tracing::debug!(
                            %id,
                            kind = message.type_name(),
                            "dropping message outside a session or not relayable"
                        );
                    }
                }
                Command::Detach { id } => self.handle_detach(id),
                Command::Stats { reply } => {
                    let _ = reply.send(self.stats());
                }
                Command::Phase { id, reply } => {
                    let phase = self.connections.get(&id).map(|t| t.phase.clone());
                    let _ = reply.send(phase);
                }
                Command::Shutdown => {
                    tracing::info!("matchmaker shutting down");
                    break;
                }
            }
        }

        tracing::info!(
            connections = self.connections.len(),
            "matchmaker stopped"
        );
    }

    fn handle_attach(&mut self, peer: Peer) -> Result<(), MatchError> {
        let id = peer.id();
        if self.connections.contains_key(&id) {
            return Err(MatchError::AlreadyAttached(id));
        }
        tracing::debug!(%id, identity = %peer.identity(), "connection attached");
        self.connections.insert(
            id,
            Tracked {
                peer,
                phase: Phase::Open,
            },
        );
        Ok(())
    }

    fn handle_request_random(
        &mut self,
        id: ConnectionId,
        identity: Option<ClientIdentity>,
    ) -> Result<MatchOutcome, MatchError> {
        let peer = self.prepare_intent(id, identity)?;
        if self.connections.get(&id).map(|t| &t.phase) != Some(&Phase::Queued) {
            self.release_waiting(id);
        }

        match self.queue.request_random_match(peer.clone()) {
            Pairing::Waiting => {
                self.set_phase(id, Phase::Queued);
                peer.send(&Message::WaitingForOpponent);
                tracing::debug!(%id, queued = self.queue.len(), "waiting for opponent");
                Ok(MatchOutcome::Waiting)
            }
            Pairing::Matched { white, black } => {
                self.start_session(id, white, black, SessionKind::Random)
            }
        }
    }

    fn handle_announce_or_join(
        &mut self,
        id: ConnectionId,
        code: RoomCode,
        identity: Option<ClientIdentity>,
    ) -> Result<MatchOutcome, MatchError> {
        let peer = self.prepare_intent(id, identity)?;
        let already_in_room = matches!(
            self.connections.get(&id).map(|t| &t.phase),
            Some(Phase::Hosting(c) | Phase::Standby(c)) if *c == code
        );
        if !already_in_room {
            self.release_waiting(id);
        }

        match self.rooms.announce_or_join(code.clone(), peer.clone()) {
            Pairing::Waiting => {
                let phase = if self.rooms.host_of(&code) == Some(id) {
                    Phase::Hosting(code.clone())
                } else {
                    Phase::Standby(code.clone())
                };
                self.set_phase(id, phase);
                self.sync_room_host(&code);
                peer.send(&Message::WaitingForFriend { room_id: code.clone() });
                tracing::debug!(%id, room = %code, "waiting for friend");
                Ok(MatchOutcome::Waiting)
            }
            Pairing::Matched { white, black } => {
                let outcome = self.start_session(id, white, black, SessionKind::Room);
                self.drop_standby(&code);
                outcome
            }
        }
    }

    /// Applies an in-band identity and checks the connection may still look
    /// for a match. Returns the up-to-date peer.
    fn prepare_intent(
        &mut self,
        id: ConnectionId,
        identity: Option<ClientIdentity>,
    ) -> Result<Peer, MatchError> {
        let tracked = self
            .connections
            .get_mut(&id)
            .ok_or(MatchError::UnknownConnection(id))?;

        match tracked.phase {
            Phase::Relaying(_) => return Err(MatchError::AlreadyLinked(id)),
            Phase::Ended => return Err(MatchError::SessionEnded(id)),
            Phase::Open | Phase::Queued | Phase::Hosting(_) | Phase::Standby(_) => {}
        }
        if let Some(identity) = identity {
            tracked.peer.set_identity(identity);
        }
        Ok(tracked.peer.clone())
    }

    /// Takes a connection out of whichever waiting structure holds it.
    fn release_waiting(&mut self, id: ConnectionId) {
        let Some(tracked) = self.connections.get_mut(&id) else {
            return;
        };
        match std::mem::replace(&mut tracked.phase, Phase::Open) {
            Phase::Queued => {
                self.queue.remove(id);
            }
            Phase::Hosting(code) | Phase::Standby(code) => self.leave_room(&code, id),
            other => tracked.phase = other,
        }
    }

    fn leave_room(&mut self, code: &RoomCode, id: ConnectionId) {
        if self.rooms.leave(code, id).is_some() {
            self.sync_room_host(code);
        }
    }

    /// Moves whoever the registry now has as host of `code` into
    /// `Hosting`. Covers a standby that took over from a closed host.
    fn sync_room_host(&mut self, code: &RoomCode) {
        let Some(host) = self.rooms.host_of(code) else {
            return;
        };
        if let Some(tracked) = self.connections.get_mut(&host) {
            if matches!(&tracked.phase, Phase::Standby(c) if c == code) {
                tracing::debug!(id = %host, room = %code, "standby now hosting");
                tracked.phase = Phase::Hosting(code.clone());
            }
        }
    }

    /// Standbys of a room that just matched have nothing left to wait for.
    fn drop_standby(&mut self, code: &RoomCode) {
        for tracked in self.connections.values_mut() {
            if matches!(&tracked.phase, Phase::Standby(c) if c == code) {
                tracked.phase = Phase::Open;
            }
        }
    }

    fn start_session(
        &mut self,
        caller: ConnectionId,
        white: Peer,
        black: Peer,
        kind: SessionKind,
    ) -> Result<MatchOutcome, MatchError> {
        self.links.wire(white.clone(), black.clone(), kind)?;

        for (peer, color) in [(&white, Color::White), (&black, Color::Black)] {
            self.set_phase(peer.id(), Phase::Relaying(kind));
            peer.send(&Message::MatchFound { color });
        }
        tracing::info!(
            white = %white.id(),
            black = %black.id(),
            %kind,
            sessions = self.links.session_count(),
            "session started"
        );

        let color = if white.id() == caller {
            Color::White
        } else {
            Color::Black
        };
        Ok(MatchOutcome::Matched(color))
    }

    fn handle_detach(&mut self, id: ConnectionId) {
        let Some(tracked) = self.connections.remove(&id) else {
            return;
        };

        match tracked.phase {
            Phase::Queued => {
                self.queue.remove(id);
            }
            Phase::Hosting(code) | Phase::Standby(code) => self.leave_room(&code, id),
            Phase::Relaying(_) => {
                if let Some(survivor) = self.links.close(id) {
                    self.set_phase(survivor, Phase::Ended);
                }
            }
            Phase::Open | Phase::Ended => {}
        }
        tracing::debug!(%id, "connection detached");
    }

    fn set_phase(&mut self, id: ConnectionId, phase: Phase) {
        if let Some(tracked) = self.connections.get_mut(&id) {
            tracked.phase = phase;
        }
    }

    fn stats(&self) -> MatchmakerStats {
        MatchmakerStats {
            connections: self.connections.len(),
            queued: self.queue.len(),
            rooms: self.rooms.len(),
            sessions: self.links.session_count(),
        }
    }
}

/// Spawns the matchmaker task and returns a handle to it.
///
/// `config.command_buffer` bounds the command channel; when it is full,
/// handlers wait.
pub fn spawn_matchmaker(config: MatchmakerConfig) -> MatchmakerHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    let actor = Matchmaker {
        connections: HashMap::new(),
        queue: RandomQueue::new(),
        rooms: RoomRegistry::new(),
        links: PeerLinks::new(),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    MatchmakerHandle { sender: tx }
}
