//! Error types for the matchmaking layer.

use knightlink_transport::ConnectionId;

/// Errors returned by the matchmaker.
///
/// None of these are fatal to the server: the connection handler logs them
/// and keeps the connection open.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// The matchmaker task is gone (shut down or panicked).
    #[error("matchmaker is unavailable")]
    Unavailable,

    /// The connection was never attached, or has already been detached.
    #[error("connection {0} is not attached")]
    UnknownConnection(ConnectionId),

    /// The connection is already attached.
    #[error("connection {0} is already attached")]
    AlreadyAttached(ConnectionId),

    /// The connection is already part of a live session. A connection handed
    /// to a peer link never goes back to a matcher.
    #[error("connection {0} is already linked to a peer")]
    AlreadyLinked(ConnectionId),

    /// The connection's session ended when its peer left.
    #[error("session for connection {0} has ended")]
    SessionEnded(ConnectionId),
}
