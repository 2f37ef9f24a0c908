//! Socket layer for Knightlink.
//!
//! Everything above this crate sees a client as a [`Connection`]: an
//! ordered, duplex stream of text frames that reports when the far side goes
//! away. Listeners implement [`Transport`]. Accepting only takes the raw
//! stream and hands back an [`Incoming`]; the upgrade runs wherever the
//! caller awaits [`Incoming::upgrade`], so a slow client never holds up the
//! listener. A connection also keeps the request target it was opened with
//! (path plus query), since that is where a client says which game it wants.
//!
//! Enabled by default, the `websocket` feature provides
//! [`WebSocketTransport`] on top of `tokio-tungstenite`.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_HANDSHAKE_TIMEOUT, IncomingWebSocket, WebSocketConnection, WebSocketTransport,
};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static LAST_CONNECTION_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique connection number, assigned in accept order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw number. Transports should use [`ConnectionId::next`];
    /// this exists for tests and for tools that replay ids.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocates the next id. Never returns the same value twice.
    pub fn next() -> Self {
        Self(LAST_CONNECTION_ID.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// A listener handing out new clients.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client socket. Does not wait for the upgrade.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    /// Stops taking new clients. Already accepted connections are untouched.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A client that has connected but not yet completed the upgrade.
pub trait Incoming: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Id the upgraded connection will carry.
    fn id(&self) -> ConnectionId;

    /// Runs the upgrade handshake, bounded by the transport's timeout.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// One client, carrying text frames in both directions.
///
/// `send` and `recv` take `&self` and may run at the same time on different
/// tasks: a relay pushes frames to a client while that client's own handler
/// sits in `recv`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one text frame.
    async fn send(&self, frame: &str) -> Result<(), Self::Error>;

    /// Reads the next text frame; `Ok(None)` once the client has gone away
    /// cleanly.
    async fn recv(&self) -> Result<Option<String>, Self::Error>;

    /// Starts a clean close.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// Path and query of the opening request, e.g. `/play-online?cid=abc`.
    fn request_target(&self) -> &str;
}
