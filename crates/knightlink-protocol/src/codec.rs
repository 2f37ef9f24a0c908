//! JSON text framing for [`Message`].
//!
//! Frames are text, not bytes: browsers send `JSON.stringify` output over
//! text WebSocket frames and expect the same back.

use crate::{Message, ProtocolError};

/// Serializes a message into a JSON text frame.
pub fn encode(message: &Message) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

/// Parses a JSON text frame.
///
/// # Errors
/// Returns [`ProtocolError::Decode`] for anything that is not a known,
/// well-shaped message: invalid JSON, a missing or unknown `type`, or a
/// payload missing required fields.
pub fn decode(frame: &str) -> Result<Message, ProtocolError> {
    serde_json::from_str(frame).map_err(ProtocolError::Decode)
}
