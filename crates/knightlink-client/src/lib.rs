//! Client side of Knightlink.
//!
//! A [`GameClient`] opens a WebSocket to the matchmaking server for one
//! [`Intent`] (random opponent, or a friend's room code), pumps
//! [`Message`](knightlink_protocol::Message)s in both directions, and
//! reconnects with exponential backoff when the link drops. Each reconnect
//! reuses the same identity and intent so the server's self-match guards can
//! recognise the client.
//!
//! The backoff bookkeeping lives in [`ReconnectController`], which has no
//! I/O and publishes a [`LinkStatus`] on a `watch` channel for the UI.

mod client;
mod controller;
mod error;
mod identity;
mod intent;

pub use client::{ClientConfig, GameClient};
pub use controller::{Decision, LinkStatus, ReconnectController, ReconnectPolicy};
pub use error::ClientError;
pub use identity::{generate_identity, generate_room_code};
pub use intent::Intent;
