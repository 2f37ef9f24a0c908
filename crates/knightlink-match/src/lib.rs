//! Matchmaking and relay for Knightlink.
//!
//! All shared state lives inside one actor task (the matchmaker) that
//! serializes access through a command channel. Connection handlers talk to
//! it through a cheap-to-clone [`MatchmakerHandle`].
//!
//! # Key types
//!
//! - [`Peer`]: one connection as the matchmaker holds it
//! - [`RandomQueue`]: FIFO of clients waiting for any opponent
//! - [`RoomRegistry`]: rooms keyed by code, waiting for a friend
//! - [`PeerLinks`]: the symmetric A↔B relay mapping
//! - [`MatchmakerHandle`]: send commands to the running actor
//! - [`Phase`]: per-connection lifecycle tracked by the actor

mod config;
mod error;
mod link;
mod matchmaker;
mod peer;
mod queue;
mod rooms;

pub use config::MatchmakerConfig;
pub use error::MatchError;
pub use link::PeerLinks;
pub use matchmaker::{
    MatchOutcome, MatchmakerHandle, MatchmakerStats, Phase, spawn_matchmaker,
};
pub use peer::{Outbox, Peer};
pub use queue::{Pairing, RandomQueue};
pub use rooms::RoomRegistry;
