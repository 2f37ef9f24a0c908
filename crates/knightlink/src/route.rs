//! Gateway routing: what a connection asked for, read from its URL.

use knightlink_protocol::{ClientIdentity, RoomCode};
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

const RANDOM_PATH: &str = "/play-online";
const ROOM_PREFIX: &str = "/play-with-friend/";

/// The intent carried by a connection's request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/play-online[?cid=..]`
    Random { identity: ClientIdentity },
    /// `/play-with-friend/{code}[?cid=..]`
    Room {
        code: RoomCode,
        identity: ClientIdentity,
    },
}

impl Route {
    /// Parses a request target such as `/play-with-friend/ABC123?cid=u1`.
    ///
    /// The identity comes from the `cid` query parameter (`clientId` is
    /// accepted too), form-decoded; when missing it is unset. A room path
    /// needs exactly one non-empty code segment, percent-decoded, and one
    /// trailing slash is tolerated. Returns `None` for anything else,
    /// including a code that is not UTF-8 once decoded.
    pub fn parse(target: &str) -> Option<Self> {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };
        let identity = identity_from_query(query);

        if path == RANDOM_PATH {
            return Some(Self::Random { identity });
        }

        let raw_code = path.strip_prefix(ROOM_PREFIX)?;
        if raw_code.is_empty() || raw_code.contains('/') {
            return None;
        }
        let code = percent_decode_str(raw_code).decode_utf8().ok()?;
        Some(Self::Room {
            code: RoomCode::new(code),
            identity,
        })
    }

    pub fn identity(&self) -> &ClientIdentity {
        match self {
            Self::Random { identity } | Self::Room { identity, .. } => identity,
        }
    }
}

fn identity_from_query(query: &str) -> ClientIdentity {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| matches!(key.as_ref(), "cid" | "clientId"))
        .map(|(_, value)| ClientIdentity::new(value))
        .unwrap_or_default()
}
