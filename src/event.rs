//! Broadcast events raised by the lobby dispatcher (§4.5).
//!
//! Each variant is a concrete, statically enumerable wire event rather than
//! an untyped payload — `RoomEvent::to_message` is the one place that maps
//! a broadcast onto its [`ServerMessage`] encoding.

use crate::protocol::messages::ServerMessage;
use crate::protocol::records::NameInfo;

/// Something the dispatcher wants delivered to some or all members of a room.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    MemberJoined(NameInfo),
    MemberLeft { seat: u8 },
    GameStarting {
        udp_port: u16,
        server_id: u16,
        server_ip: u32,
    },
    SessionCancelled,
}

impl RoomEvent {
    pub fn to_message(&self) -> ServerMessage {
        match self {
            Self::MemberJoined(info) => ServerMessage::MemberJoined(info.clone()),
            Self::MemberLeft { seat } => ServerMessage::MemberLeft { seat: *seat },
            Self::GameStarting {
                udp_port,
                server_id,
                server_ip,
            } => ServerMessage::GameStart {
                udp_port: *udp_port,
                server_id: *server_id,
                server_ip: *server_ip,
            },
            Self::SessionCancelled => ServerMessage::SessionCancelled,
        }
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
    fn member_left_maps_to_matching_server_message() {
        let event = RoomEvent::MemberLeft { seat: 3 };
        assert_eq!(event.to_message(), ServerMessage::MemberLeft { seat: 3 });
    }

    #[test]
    fn game_starting_carries_connection_details() {
        let event = RoomEvent::GameStarting {
            udp_port: 9001,
            server_id: 1,
            server_ip: 0x7f00_0001,
        };
        assert_eq!(
            event.to_message(),
            ServerMessage::GameStart {
                udp_port: 9001,
                server_id: 1,
                server_ip: 0x7f00_0001,
            }
        );
    }
}
