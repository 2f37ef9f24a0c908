//! What the client asked the server for.

use std::fmt;

use knightlink_protocol::{ClientIdentity, RoomCode};
use url::{ParseError, Url};

/// The kind of game a client wants. Fixed for the lifetime of a
/// [`GameClient`](crate::GameClient) so every reconnect asks for the same
/// thing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Any opponent, from the random queue.
    Random,
    /// The friend sharing this room code.
    Room(RoomCode),
}

impl Intent {
    /// Builds the WebSocket URL for this intent, e.g.
    /// `ws://host:3000/play-with-friend/ABC123?cid=<identity>`.
    ///
    /// The route is appended to any path already in `server_url`. The room
    /// code and identity are percent-encoded; an unset identity is left out
    /// of the query.
    pub fn url(&self, server_url: &str, identity: &ClientIdentity) -> Result<Url, ParseError> {
        let mut url = Url::parse(server_url)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty();
            match self {
                Self::Random => segments.push("play-online"),
                Self::Room(code) => segments.extend(["play-with-friend", code.as_str()]),
            };
        }
        if identity.is_set() {
            url.query_pairs_mut().append_pair("cid", identity.as_str());
        }
        Ok(url)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => f.write_str("random opponent"),
            Self::Room(code) => write!(f, "room {code}"),
        }
    }
}
