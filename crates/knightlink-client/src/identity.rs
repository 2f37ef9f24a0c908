//! Random identities and room codes.

use knightlink_protocol::{ClientIdentity, RoomCode};
use rand::Rng;

const ROOM_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ROOM_CODE_LEN: usize = 8;

/// Generates a fresh client identity: 32 lowercase hex characters.
///
/// Create it once per local session and keep it across reconnects. It only
/// has to be unlikely to collide with another client's, it is not a secret.
pub fn generate_identity() -> ClientIdentity {
    let bytes: [u8; 16] = rand::rng().random();
    ClientIdentity::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}

/// Generates a room code to share with a friend: 8 characters of `[0-9A-Z]`.
pub fn generate_room_code() -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (0..ROOM_CODE_LEN)
        .map(|_| char::from(ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())]))
        .collect();
    RoomCode::new(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_identity_is_32_hex_chars() {
        let id = generate_identity();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(id.is_set());
    }

    #[test]
    fn test_generate_identity_is_unique() {
        assert_ne!(generate_identity(), generate_identity());
    }

    #[test]
    fn test_generate_room_code_shape() {
        let code = generate_room_code();
        assert_eq!(code.as_str().len(), 8);
        assert!(
            code.as_str()
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
        );
    }
}
