//! Error codes for structured error handling in the lobby protocol.
//!
//! These codes are wire-compatible with the reliable channel's `PROTOCOL_ERROR`
//! and `JOIN_NAK`/`HELLO_NAK` payloads: each variant maps to the single byte
//! carried on the wire (see [`ErrorCode::wire_byte`] / [`ErrorCode::from_wire_byte`]).

use std::fmt;

/// Structured error codes exchanged with clients over the reliable channel.
///
/// Use [`description()`](ErrorCode::description) for a human-readable explanation
/// suitable for logs or diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    RoomFull,
    RoomNotFound,
    AlreadyStarted,
    InvalidName,
    ProtocolViolation,
    UnexpectedMessage,
    Timeout,
    Internal,
    NotInRoom,
    AlreadyInRoom,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RoomFull => "The room has reached its maximum player capacity.",
            Self::RoomNotFound => {
                "The requested room could not be found. It may have closed or the id is incorrect."
            }
            Self::AlreadyStarted => "The room's game has already started.",
            Self::InvalidName => "The provided name is invalid or out of the allowed length range.",
            Self::ProtocolViolation => "The received frame violated the wire protocol.",
            Self::UnexpectedMessage => "That message is not valid in the client's current state.",
            Self::Timeout => "The operation timed out.",
            Self::Internal => "An internal server error occurred.",
            Self::NotInRoom => "You are not currently in any room.",
            Self::AlreadyInRoom => "You are already in a room. Leave it before joining another.",
        }
    }

    /// The single byte this code is encoded as on the wire.
    pub fn wire_byte(self) -> u8 {
        match self {
            Self::RoomFull => 0x01,
            Self::RoomNotFound => 0x02,
            Self::AlreadyStarted => 0x03,
            Self::InvalidName => 0x04,
            Self::ProtocolViolation => 0x05,
            Self::UnexpectedMessage => 0x06,
            Self::Timeout => 0x07,
            Self::Internal => 0x08,
            Self::NotInRoom => 0x09,
            Self::AlreadyInRoom => 0x0A,
        }
    }

    /// Decode a wire byte into its error code, if recognized.
    pub fn from_wire_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::RoomFull),
            0x02 => Some(Self::RoomNotFound),
            0x03 => Some(Self::AlreadyStarted),
            0x04 => Some(Self::InvalidName),
            0x05 => Some(Self::ProtocolViolation),
            0x06 => Some(Self::UnexpectedMessage),
            0x07 => Some(Self::Timeout),
            0x08 => Some(Self::Internal),
            0x09 => Some(Self::NotInRoom),
            0x0A => Some(Self::AlreadyInRoom),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
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
    fn wire_byte_round_trips() {
        let codes = [
            ErrorCode::RoomFull,
            ErrorCode::RoomNotFound,
            ErrorCode::AlreadyStarted,
            ErrorCode::InvalidName,
            ErrorCode::ProtocolViolation,
            ErrorCode::UnexpectedMessage,
            ErrorCode::Timeout,
            ErrorCode::Internal,
            ErrorCode::NotInRoom,
            ErrorCode::AlreadyInRoom,
        ];
        for code in codes {
            let byte = code.wire_byte();
            assert_eq!(ErrorCode::from_wire_byte(byte), Some(code));
        }
    }

    #[test]
    fn unknown_byte_decodes_to_none() {
        assert_eq!(ErrorCode::from_wire_byte(0xEE), None);
    }
}
