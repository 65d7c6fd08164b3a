//! Error types for the Voidrunner server.

use crate::error_codes::ErrorCode;
use thiserror::Error;

/// Errors produced while decoding or encoding a wire frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer than [`crate::protocol::frame::HEADER_SIZE`] bytes were available.
    #[error("malformed header: need {needed} bytes, have {have}")]
    MalformedHeader { needed: usize, have: usize },

    /// The header's declared length does not match the available payload.
    #[error("length mismatch: header declares {declared}, payload has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// The type byte does not correspond to a known message.
    #[error("unknown message type: 0x{0:02X}")]
    UnknownType(u8),

    /// A fixed-width field (e.g. a name) did not fit the on-wire layout.
    #[error("field too long: {field} is {actual} bytes, max {max}")]
    FieldTooLong {
        field: &'static str,
        actual: usize,
        max: usize,
    },
}

/// Errors surfaced by the lobby session manager.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LobbyError {
    #[error("{0}")]
    Code(ErrorCode),
}

impl From<ErrorCode> for LobbyError {
    fn from(code: ErrorCode) -> Self {
        Self::Code(code)
    }
}

/// Top-level error type for the Voidrunner server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A wire frame could not be decoded or encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A lobby/session operation was rejected.
    #[error("lobby error: {0}")]
    Lobby(#[from] LobbyError),

    /// An I/O error occurred on a transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A peer's connection closed or errored.
    #[error("connection closed")]
    ConnectionClosed,
}

/// A specialized [`Result`] type for Voidrunner server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

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
    fn lobby_error_wraps_error_code() {
        let err: ServerError = LobbyError::Code(ErrorCode::RoomFull).into();
        match err {
            ServerError::Lobby(LobbyError::Code(code)) => assert_eq!(code, ErrorCode::RoomFull),
            other => panic!("expected Lobby error, got {other:?}"),
        }
    }

    #[test]
    fn codec_error_displays_type_byte_in_hex() {
        let err = CodecError::UnknownType(0xAB);
        assert_eq!(err.to_string(), "unknown message type: 0xAB");
    }
}
