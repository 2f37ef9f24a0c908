//! # Knightlink
//!
//! A matchmaking and relay server for two-player chess over WebSockets.
//!
//! Clients connect to one of two routes:
//!
//! - `/play-online[?cid=<identity>]` pairs them with the next available
//!   opponent from a FIFO queue.
//! - `/play-with-friend/{roomCode}[?cid=<identity>]` pairs them with
//!   whoever else uses the same room code.
//!
//! Once paired, `move`, `chatMessage` and `startGame` frames are relayed
//! verbatim between the two sides until one of them disconnects, at which
//! point the other gets `opponentDisconnected` or `friendLeft`. The server
//! never looks at the board.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use knightlink::prelude::*;
//!
//! # async fn demo() -> Result<(), KnightlinkError> {
//! let server = KnightlinkServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await
//! # }
//! ```

mod error;
mod handler;
pub mod logger;
mod route;
mod server;

pub use error::KnightlinkError;
pub use route::Route;
pub use server::{KnightlinkServer, KnightlinkServerBuilder};

/// Everything needed to run a server or drive a client.
pub mod prelude {
    pub use crate::{KnightlinkError, KnightlinkServer, KnightlinkServerBuilder, Route};
    pub use knightlink_client::{
        ClientConfig, ClientError, GameClient, Intent, LinkStatus, ReconnectPolicy,
        generate_identity, generate_room_code,
    };
    pub use knightlink_match::{MatchError, MatchmakerConfig, MatchmakerHandle, MatchmakerStats};
    pub use knightlink_protocol::{ClientIdentity, Color, Message, RoomCode};
}
