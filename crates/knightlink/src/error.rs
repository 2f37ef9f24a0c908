//! Unified error type for Knightlink.

use knightlink_client::ClientError;
use knightlink_match::MatchError;
use knightlink_protocol::ProtocolError;
use knightlink_transport::TransportError;

/// Top-level error wrapping every crate-specific error.
///
/// The `#[from]` attributes generate the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum KnightlinkError {
    /// Binding, accepting, or reading from / writing to a socket.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding a frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The matchmaker refused a request or is gone.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The client driver ran out of reconnect attempts.
    #[error(transparent)]
    Client(#[from] ClientError),
}
