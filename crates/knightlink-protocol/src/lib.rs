//! Wire protocol for Knightlink.
//!
//! This crate defines what travels between a chess client and the
//! matchmaking server:
//!
//! - **Types** ([`Message`], [`Color`], [`ClientIdentity`], [`RoomCode`]):
//!   the JSON envelope with its `type` discriminator, and the identity
//!   newtypes.
//! - **Codec** ([`encode`], [`decode`]): JSON text frames in and out.
//! - **Errors** ([`ProtocolError`]).
//!
//! The server never inspects move legality. It decodes frames only to learn
//! their type and check their shape, then relays the text as received.

mod codec;
mod error;
mod types;

pub use codec::{decode, encode};
pub use error::ProtocolError;
pub use types::{ClientIdentity, Color, Message, RoomCode, SessionKind};
