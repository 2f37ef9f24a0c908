//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
///
/// Decode failures are expected traffic, not incidents: a frame that fails
/// to decode is dropped and the connection stays open.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into a JSON frame).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: not JSON, no `type`, an unknown `type`,
    /// or a payload of the wrong shape.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}
