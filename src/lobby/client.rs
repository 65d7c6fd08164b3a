//! Client records tracked by the lobby session manager.

/// Maximum length, in bytes, of a player display name.
pub const MAX_NAME_LENGTH: usize = 59;

/// Per-client state machine over the reliable channel.
///
/// The "connecting" state (before a valid `HELLO` is received) has no
/// variant here: it is modeled as the absence of a [`ClientRecord`] in the
/// lobby manager, since there is nothing to track for a client until its
/// name is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connected,
    Ready,
    InGame,
}

/// A connected client's lobby-facing identity.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub client_id: u64,
    pub name: String,
    pub room_id: Option<u16>,
    pub state: ClientState,
}

impl ClientRecord {
    pub fn new(client_id: u64, name: String) -> Self {
        Self {
            client_id,
            name,
            room_id: None,
            state: ClientState::Connected,
        }
    }
}

/// Validate a display/room name: 1..=max printable bytes.
pub fn validate_name(name: &str, max_len: usize) -> bool {
    !name.is_empty()
        && name.len() <= max_len
        && name.bytes().all(|b| (0x20..0x7F).contains(&b))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_oversized_names() {
        assert!(!validate_name("", MAX_NAME_LENGTH));
        assert!(!validate_name(&"x".repeat(MAX_NAME_LENGTH + 1), MAX_NAME_LENGTH));
        assert!(validate_name("Astra", MAX_NAME_LENGTH));
    }

    #[test]
    fn rejects_non_printable_bytes() {
        assert!(!validate_name("bad\u{0007}name", MAX_NAME_LENGTH));
    }
}
