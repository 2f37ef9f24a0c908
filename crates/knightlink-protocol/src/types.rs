//! Core protocol types for Knightlink's wire format.
//!
//! Every frame is a JSON object with a required `type` discriminator. The
//! same [`Message`] enum covers both directions so that a relay, a server
//! handler and a client all decode frames the same way.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// An opaque, client-generated identity token.
///
/// A client creates it once and reuses it across reconnects so the server
/// can tell "the same client again" from "a different client". It is only
/// ever compared for equality and is NOT a credential: anyone can claim any
/// identity. An empty token means "unset".
///
/// `#[serde(transparent)]` keeps it a plain JSON string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Wraps a raw token. An empty string yields an unset identity.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The identity used when a client does not send one.
    pub fn unset() -> Self {
        Self::default()
    }

    /// Returns `true` if the client supplied a non-empty token.
    pub fn is_set(&self) -> bool {
        !self.0.is_empty()
    }

    /// Returns `true` if both identities are set and equal.
    ///
    /// This is the self-match guard: two unset identities are never
    /// considered the same client.
    pub fn same_client(&self, other: &ClientIdentity) -> bool {
        self.is_set() && self.0 == other.0
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            f.write_str(&self.0)
        } else {
            f.write_str("<anonymous>")
        }
    }
}

/// A caller-chosen code two friends use to find each other.
///
/// Any string is a valid code; there is no registry of "known" rooms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a raw room code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the raw code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Color and session kind
// ---------------------------------------------------------------------------

/// The side a player is assigned when a match is made.
///
/// Whoever was already waiting plays white; the new arrival plays black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Returns the opposite color.
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => f.write_str("white"),
            Self::Black => f.write_str("black"),
        }
    }
}

/// How a session was formed. Decides which notification the survivor gets
/// when the other side leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// Paired from the random queue.
    Random,
    /// Paired through a shared room code.
    Room,
}

impl SessionKind {
    /// The terminal message sent to the surviving peer.
    pub fn peer_left_message(self) -> Message {
        match self {
            Self::Random => Message::OpponentDisconnected,
            Self::Room => Message::FriendLeft,
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => f.write_str("random"),
            Self::Room => f.write_str("room"),
        }
    }
}

// ---------------------------------------------------------------------------
// Message: the envelope
// ---------------------------------------------------------------------------

/// Every frame on the wire.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, e.g.
/// `{"type":"matchFound","color":"white"}`. Variant and field names are
/// camelCase to match what browser clients send. Unknown fields are
/// ignored, unknown `type` values fail to decode.
///
/// | type | direction |
/// |---|---|
/// | `queueRandom`, `joinRoom` | client → server |
/// | `waitingForOpponent`, `waitingForFriend`, `matchFound` | server → client |
/// | `move`, `chatMessage`, `startGame` | relayed between peers |
/// | `opponentDisconnected`, `friendLeft` | server → client |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    /// Ask to be paired with any opponent.
    QueueRandom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<ClientIdentity>,
    },

    /// Host or join the room with the given code.
    JoinRoom {
        room_id: RoomCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<ClientIdentity>,
    },

    /// Queued; no opponent yet.
    WaitingForOpponent,

    /// Hosting `room_id`; share it with a friend.
    WaitingForFriend { room_id: RoomCode },

    /// Paired. `color` is the side this client plays.
    MatchFound { color: Color },

    /// A move, in the client's own notation. Relayed verbatim.
    Move {
        from: String,
        to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        promotion: Option<String>,
    },

    /// A chat line. Relayed verbatim.
    ChatMessage { text: String },

    /// Agreed time control in seconds (`null` = untimed). Relayed to both
    /// sides as confirmation.
    StartGame { time_control: Option<u32> },

    /// The random opponent left.
    OpponentDisconnected,

    /// The friend left.
    FriendLeft,
}

impl Message {
    /// Returns `true` for the types a peer link forwards between players.
    pub fn is_relayed(&self) -> bool {
        matches!(
            self,
            Self::Move { .. } | Self::ChatMessage { .. } | Self::StartGame { .. }
        )
    }

    /// Returns `true` for relayed types that are echoed back to the sender
    /// as well as forwarded.
    pub fn is_broadcast(&self) -> bool {
        matches!(self, Self::StartGame { .. })
    }

    /// Returns `true` for the terminal "your peer is gone" notifications.
    pub fn is_peer_left(&self) -> bool {
        matches!(self, Self::OpponentDisconnected | Self::FriendLeft)
    }

    /// The wire name of this message's `type`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::QueueRandom { .. } => "queueRandom",
            Self::JoinRoom { .. } => "joinRoom",
            Self::WaitingForOpponent => "waitingForOpponent",
            Self::WaitingForFriend { .. } => "waitingForFriend",
            Self::MatchFound { .. } => "matchFound",
            Self::Move { .. } => "move",
            Self::ChatMessage { .. } => "chatMessage",
            Self::StartGame { .. } => "startGame",
            Self::OpponentDisconnected => "opponentDisconnected",
            Self::FriendLeft => "friendLeft",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The JSON shapes here are what browser clients already speak, so a
    //! serde attribute drifting is a protocol break.

    use super::*;

    use serde_json::json;

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_client_identity_serializes_as_plain_string() {
        let json = serde_json::to_string(&ClientIdentity::new("u1")).unwrap();
        assert_eq!(json, "\"u1\"");
    }

    #[test]
    fn test_same_client_requires_set_identities() {
        let a = ClientIdentity::new("u1");
        let b = ClientIdentity::new("u1");
        let c = ClientIdentity::new("u2");

        assert!(a.same_client(&b));
        assert!(!a.same_client(&c));
        // Two anonymous clients are never the same client.
        assert!(!ClientIdentity::unset().same_client(&ClientIdentity::unset()));
        assert!(!ClientIdentity::unset().same_client(&a));
    }

    #[test]
    fn test_client_identity_display_unset() {
        assert_eq!(ClientIdentity::unset().to_string(), "<anonymous>");
        assert_eq!(ClientIdentity::new("u9").to_string(), "u9");
    }

    #[test]
    fn test_color_opponent() {
        assert_eq!(Color::White.opponent(), Color::Black);
        assert_eq!(Color::Black.opponent(), Color::White);
    }

    // =====================================================================
    // Message: JSON shape per direction
    // =====================================================================

    #[test]
    fn test_match_found_json_format() {
        let value =
            serde_json::to_value(Message::MatchFound { color: Color::White })
                .unwrap();
        assert_eq!(value, json!({"type": "matchFound", "color": "white"}));
    }

    #[test]
    fn test_unit_variants_json_format() {
        assert_eq!(
            serde_json::to_value(Message::WaitingForOpponent).unwrap(),
            json!({"type": "waitingForOpponent"})
        );
        assert_eq!(
            serde_json::to_value(Message::OpponentDisconnected).unwrap(),
            json!({"type": "opponentDisconnected"})
        );
        assert_eq!(
            serde_json::to_value(Message::FriendLeft).unwrap(),
            json!({"type": "friendLeft"})
        );
    }

    #[test]
    fn test_waiting_for_friend_uses_room_id_field() {
        let msg = Message::WaitingForFriend {
            room_id: RoomCode::new("ABC123"),
        };
        assert_eq!(
            serde_json::to_value(msg).unwrap(),
            json!({"type": "waitingForFriend", "roomId": "ABC123"})
        );
    }

    #[test]
    fn test_join_room_decodes_camel_case_fields() {
        let msg: Message = serde_json::from_str(
            r#"{"type":"joinRoom","roomId":"ABC123","clientId":"u1"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            Message::JoinRoom {
                room_id: RoomCode::new("ABC123"),
                client_id: Some(ClientIdentity::new("u1")),
            }
        );
    }

    #[test]
    fn test_queue_random_client_id_is_optional() {
        let msg: Message =
            serde_json::from_str(r#"{"type":"queueRandom"}"#).unwrap();
        assert_eq!(msg, Message::QueueRandom { client_id: None });
    }

    #[test]
    fn test_move_without_promotion_decodes() {
        // Browsers drop `promotion: undefined` when stringifying.
        let msg: Message =
            serde_json::from_str(r#"{"type":"move","from":"e2","to":"e4"}"#)
                .unwrap();
        assert_eq!(
            msg,
            Message::Move {
                from: "e2".into(),
                to: "e4".into(),
                promotion: None,
            }
        );
    }

    #[test]
    fn test_start_game_null_time_control() {
        let msg: Message =
            serde_json::from_str(r#"{"type":"startGame","timeControl":null}"#)
                .unwrap();
        assert_eq!(msg, Message::StartGame { time_control: None });

        let msg: Message =
            serde_json::from_str(r#"{"type":"startGame","timeControl":300}"#)
                .unwrap();
        assert_eq!(msg, Message::StartGame { time_control: Some(300) });
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        // Older servers added an `opponent` field to matchFound.
        let msg: Message = serde_json::from_str(
            r#"{"type":"matchFound","opponent":"player2","color":"black"}"#,
        )
        .unwrap();
        assert_eq!(msg, Message::MatchFound { color: Color::Black });
    }

    // =====================================================================
    // Classification
    // =====================================================================

    #[test]
    fn test_is_relayed_whitelist() {
        let relayed = [
            Message::Move {
                from: "e2".into(),
                to: "e4".into(),
                promotion: None,
            },
            Message::ChatMessage { text: "hi".into() },
            Message::StartGame { time_control: None },
        ];
        for msg in &relayed {
            assert!(msg.is_relayed(), "{} should be relayed", msg.type_name());
        }

        let not_relayed = [
            Message::QueueRandom { client_id: None },
            Message::WaitingForOpponent,
            Message::MatchFound { color: Color::White },
            Message::OpponentDisconnected,
            Message::FriendLeft,
        ];
        for msg in &not_relayed {
            assert!(!msg.is_relayed(), "{} must not be relayed", msg.type_name());
        }
    }

    #[test]
    fn test_only_start_game_is_broadcast() {
        assert!(Message::StartGame { time_control: Some(60) }.is_broadcast());
        assert!(!Message::ChatMessage { text: "x".into() }.is_broadcast());
    }

    #[test]
    fn test_session_kind_peer_left_message() {
        assert_eq!(
            SessionKind::Random.peer_left_message(),
            Message::OpponentDisconnected
        );
        assert_eq!(SessionKind::Room.peer_left_message(), Message::FriendLeft);
    }

    // =====================================================================
    // Malformed input
    // =====================================================================

    #[test]
    fn test_decode_missing_type_returns_error() {
        let result: Result<Message, _> = serde_json::from_str(r#"{"text":"hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_unknown_type_returns_error() {
        let result: Result<Message, _> =
            serde_json::from_str(r#"{"type":"resign"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_move_missing_fields_returns_error() {
        let result: Result<Message, _> =
            serde_json::from_str(r#"{"type":"move","from":"e2"}"#);
        assert!(result.is_err());
    }
}
