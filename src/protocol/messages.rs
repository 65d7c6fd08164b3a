//! Reliable-channel message types: the lobby/matchmaking wire protocol.

use byteorder::{BigEndian, ByteOrder};

use crate::error::CodecError;
use crate::error_codes::ErrorCode;
use crate::protocol::frame::{encode_frame, HEADER_SIZE};
use crate::protocol::records::{NameInfo, RoomInfo, MAX_NAME_LENGTH, MAX_ROOM_NAME_LENGTH};

/// Reliable-channel message type bytes.
pub mod msg_type {
    pub const HELLO: u8 = 0x01;
    pub const HELLO_ACK: u8 = 0x02;
    pub const HELLO_NAK: u8 = 0x03;
    pub const READY: u8 = 0x04;
    pub const GAME_START: u8 = 0x05;
    pub const LIST_ROOMS: u8 = 0x10;
    pub const LIST_ROOMS_RESP: u8 = 0x11;
    pub const ROOM_INFO: u8 = 0x12;
    pub const ROOM_INFO_RESP: u8 = 0x13;
    pub const CREATE_ROOM: u8 = 0x14;
    pub const CREATE_ACK: u8 = 0x15;
    pub const JOIN_ROOM: u8 = 0x16;
    pub const JOIN_ACK: u8 = 0x17;
    pub const JOIN_NAK: u8 = 0x18;
    pub const LEAVE_ROOM: u8 = 0x19;
    pub const LEAVE_ACK: u8 = 0x1A;
    pub const MEMBER_JOINED: u8 = 0x1B;
    pub const MEMBER_LEFT: u8 = 0x1C;
    pub const SESSION_CANCELLED: u8 = 0x1D;
    pub const PROTOCOL_ERROR: u8 = 0xFF;
}

/// Messages a client may send on the reliable channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Hello { name: String },
    Ready { ready: bool },
    ListRooms,
    RoomInfo { room_id: u16 },
    CreateRoom { capacity: u8, name: String },
    JoinRoom { room_id: u16 },
    LeaveRoom,
}

/// Messages the server may send on the reliable channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    HelloAck { seat: u8 },
    HelloNak { error: ErrorCode },
    GameStart {
        udp_port: u16,
        server_id: u16,
        server_ip: u32,
    },
    ListRoomsResp { rooms: Vec<RoomInfo> },
    RoomInfoResp(RoomInfo),
    CreateAck { room_id: u16 },
    JoinAck {
        room_id: u16,
        your_seat: u8,
        members: Vec<NameInfo>,
    },
    JoinNak { error: ErrorCode },
    LeaveAck,
    MemberJoined(NameInfo),
    MemberLeft { seat: u8 },
    SessionCancelled,
    ProtocolError { error: ErrorCode },
}

fn read_u16(buf: &[u8], offset: usize) -> Result<u16, CodecError> {
    if buf.len() < offset + 2 {
        return Err(CodecError::LengthMismatch {
            declared: offset + 2,
            actual: buf.len(),
        });
    }
    Ok(BigEndian::read_u16(&buf[offset..offset + 2]))
}

fn read_u8(buf: &[u8], offset: usize) -> Result<u8, CodecError> {
    buf.get(offset).copied().ok_or(CodecError::LengthMismatch {
        declared: offset + 1,
        actual: buf.len(),
    })
}

fn read_padded_name(buf: &[u8], max_len: usize) -> Result<String, CodecError> {
    let name_len = read_u16(buf, 0)? as usize;
    if name_len > max_len {
        return Err(CodecError::FieldTooLong {
            field: "name",
            actual: name_len,
            max: max_len,
        });
    }
    if buf.len() < 2 + name_len {
        return Err(CodecError::LengthMismatch {
            declared: 2 + name_len,
            actual: buf.len(),
        });
    }
    Ok(String::from_utf8_lossy(&buf[2..2 + name_len]).into_owned())
}

fn write_padded_name(out: &mut Vec<u8>, name: &str, max_len: usize) -> Result<(), CodecError> {
    let bytes = name.as_bytes();
    if bytes.len() > max_len {
        return Err(CodecError::FieldTooLong {
            field: "name",
            actual: bytes.len(),
            max: max_len,
        });
    }
    let mut len_buf = [0u8; 2];
    BigEndian::write_u16(&mut len_buf, bytes.len() as u16);
    out.extend_from_slice(&len_buf);
    out.extend_from_slice(bytes);
    out.resize(out.len() + (max_len - bytes.len()), 0);
    Ok(())
}

fn error_code_or_internal(byte: u8) -> ErrorCode {
    ErrorCode::from_wire_byte(byte).unwrap_or(ErrorCode::Internal)
}

impl ClientMessage {
    /// Decode the payload of a frame already known to carry this message type.
    pub fn decode(msg_type: u8, payload: &[u8]) -> Result<Self, CodecError> {
        match msg_type {
            msg_type::HELLO => Ok(Self::Hello {
                name: read_padded_name(payload, MAX_NAME_LENGTH)?,
            }),
            msg_type::READY => Ok(Self::Ready {
                ready: read_u8(payload, 0)? != 0,
            }),
            msg_type::LIST_ROOMS => Ok(Self::ListRooms),
            msg_type::ROOM_INFO => Ok(Self::RoomInfo {
                room_id: read_u16(payload, 0)?,
            }),
            msg_type::CREATE_ROOM => {
                let capacity = read_u8(payload, 0)?;
                let name = read_padded_name(&payload[1..], MAX_ROOM_NAME_LENGTH)?;
                Ok(Self::CreateRoom { capacity, name })
            }
            msg_type::JOIN_ROOM => Ok(Self::JoinRoom {
                room_id: read_u16(payload, 0)?,
            }),
            msg_type::LEAVE_ROOM => Ok(Self::LeaveRoom),
            other => Err(CodecError::UnknownType(other)),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut payload = Vec::new();
        let msg_type = match self {
            Self::Hello { name } => {
                write_padded_name(&mut payload, name, MAX_NAME_LENGTH)?;
                msg_type::HELLO
            }
            Self::Ready { ready } => {
                payload.push(u8::from(*ready));
                msg_type::READY
            }
            Self::ListRooms => msg_type::LIST_ROOMS,
            Self::RoomInfo { room_id } => {
                let mut buf = [0u8; 2];
                BigEndian::write_u16(&mut buf, *room_id);
                payload.extend_from_slice(&buf);
                msg_type::ROOM_INFO
            }
            Self::CreateRoom { capacity, name } => {
                payload.push(*capacity);
                write_padded_name(&mut payload, name, MAX_ROOM_NAME_LENGTH)?;
                msg_type::CREATE_ROOM
            }
            Self::JoinRoom { room_id } => {
                let mut buf = [0u8; 2];
                BigEndian::write_u16(&mut buf, *room_id);
                payload.extend_from_slice(&buf);
                msg_type::JOIN_ROOM
            }
            Self::LeaveRoom => msg_type::LEAVE_ROOM,
        };
        Ok(encode_frame(msg_type, &payload))
    }
}

impl ServerMessage {
    pub fn decode(msg_type: u8, payload: &[u8]) -> Result<Self, CodecError> {
        match msg_type {
            msg_type::HELLO_ACK => Ok(Self::HelloAck {
                seat: read_u8(payload, 0)?,
            }),
            msg_type::HELLO_NAK => Ok(Self::HelloNak {
                error: error_code_or_internal(read_u8(payload, 0)?),
            }),
            msg_type::GAME_START => {
                let udp_port = read_u16(payload, 0)?;
                let server_id = read_u16(payload, 2)?;
                if payload.len() < 8 {
                    return Err(CodecError::LengthMismatch {
                        declared: 8,
                        actual: payload.len(),
                    });
                }
                let server_ip = BigEndian::read_u32(&payload[4..8]);
                Ok(Self::GameStart {
                    udp_port,
                    server_id,
                    server_ip,
                })
            }
            msg_type::LIST_ROOMS_RESP => {
                let count = read_u16(payload, 0)? as usize;
                let mut rooms = Vec::with_capacity(count);
                let mut offset = 2;
                for _ in 0..count {
                    rooms.push(RoomInfo::decode(&payload[offset..])?);
                    offset += crate::protocol::records::ROOM_INFO_SIZE;
                }
                Ok(Self::ListRoomsResp { rooms })
            }
            msg_type::ROOM_INFO_RESP => Ok(Self::RoomInfoResp(RoomInfo::decode(payload)?)),
            msg_type::CREATE_ACK => Ok(Self::CreateAck {
                room_id: read_u16(payload, 0)?,
            }),
            msg_type::JOIN_ACK => {
                let room_id = read_u16(payload, 0)?;
                let your_seat = read_u8(payload, 2)?;
                let count = read_u16(payload, 3)? as usize;
                let mut members = Vec::with_capacity(count);
                let mut offset = 5;
                for _ in 0..count {
                    members.push(NameInfo::decode(&payload[offset..])?);
                    offset += crate::protocol::records::NAME_INFO_SIZE;
                }
                Ok(Self::JoinAck {
                    room_id,
                    your_seat,
                    members,
                })
            }
            msg_type::JOIN_NAK => Ok(Self::JoinNak {
                error: error_code_or_internal(read_u8(payload, 0)?),
            }),
            msg_type::LEAVE_ACK => Ok(Self::LeaveAck),
            msg_type::MEMBER_JOINED => Ok(Self::MemberJoined(NameInfo::decode(payload)?)),
            msg_type::MEMBER_LEFT => Ok(Self::MemberLeft {
                seat: read_u8(payload, 0)?,
            }),
            msg_type::SESSION_CANCELLED => Ok(Self::SessionCancelled),
            msg_type::PROTOCOL_ERROR => Ok(Self::ProtocolError {
                error: error_code_or_internal(read_u8(payload, 0)?),
            }),
            other => Err(CodecError::UnknownType(other)),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut payload = Vec::new();
        let msg_type = match self {
            Self::HelloAck { seat } => {
                payload.push(*seat);
                msg_type::HELLO_ACK
            }
            Self::HelloNak { error } => {
                payload.push(error.wire_byte());
                msg_type::HELLO_NAK
            }
            Self::GameStart {
                udp_port,
                server_id,
                server_ip,
            } => {
                let mut buf = [0u8; 2];
                BigEndian::write_u16(&mut buf, *udp_port);
                payload.extend_from_slice(&buf);
                BigEndian::write_u16(&mut buf, *server_id);
                payload.extend_from_slice(&buf);
                let mut ip_buf = [0u8; 4];
                BigEndian::write_u32(&mut ip_buf, *server_ip);
                payload.extend_from_slice(&ip_buf);
                msg_type::GAME_START
            }
            Self::ListRoomsResp { rooms } => {
                let mut buf = [0u8; 2];
                BigEndian::write_u16(&mut buf, rooms.len() as u16);
                payload.extend_from_slice(&buf);
                for room in rooms {
                    room.encode(&mut payload)?;
                }
                msg_type::LIST_ROOMS_RESP
            }
            Self::RoomInfoResp(info) => {
                info.encode(&mut payload)?;
                msg_type::ROOM_INFO_RESP
            }
            Self::CreateAck { room_id } => {
                let mut buf = [0u8; 2];
                BigEndian::write_u16(&mut buf, *room_id);
                payload.extend_from_slice(&buf);
                msg_type::CREATE_ACK
            }
            Self::JoinAck {
                room_id,
                your_seat,
                members,
            } => {
                let mut buf = [0u8; 2];
                BigEndian::write_u16(&mut buf, *room_id);
                payload.extend_from_slice(&buf);
                payload.push(*your_seat);
                BigEndian::write_u16(&mut buf, members.len() as u16);
                payload.extend_from_slice(&buf);
                for member in members {
                    member.encode(&mut payload)?;
                }
                msg_type::JOIN_ACK
            }
            Self::JoinNak { error } => {
                payload.push(error.wire_byte());
                msg_type::JOIN_NAK
            }
            Self::LeaveAck => msg_type::LEAVE_ACK,
            Self::MemberJoined(info) => {
                info.encode(&mut payload)?;
                msg_type::MEMBER_JOINED
            }
            Self::MemberLeft { seat } => {
                payload.push(*seat);
                msg_type::MEMBER_LEFT
            }
            Self::SessionCancelled => msg_type::SESSION_CANCELLED,
            Self::ProtocolError { error } => {
                payload.push(error.wire_byte());
                msg_type::PROTOCOL_ERROR
            }
        };
        Ok(encode_frame(msg_type, &payload))
    }
}

/// True if `HEADER_SIZE` bytes are present and the type byte is recognized as
/// a reliable-channel client message. Used by the dispatcher to decide
/// whether to reply with `UnknownType` before attempting a full decode.
pub fn is_known_client_type(msg_type: u8) -> bool {
    matches!(
        msg_type,
        msg_type::HELLO
            | msg_type::READY
            | msg_type::LIST_ROOMS
            | msg_type::ROOM_INFO
            | msg_type::CREATE_ROOM
            | msg_type::JOIN_ROOM
            | msg_type::LEAVE_ROOM
    )
}

const _: () = assert!(HEADER_SIZE == 4);

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
    use crate::protocol::frame::try_parse_frame;
    use crate::lobby::room::RoomStatus;

    fn round_trip_client(msg: ClientMessage) -> ClientMessage {
        let encoded = msg.encode().unwrap();
        let (header, payload, _) = try_parse_frame(&encoded).unwrap().unwrap();
        ClientMessage::decode(header.msg_type, payload).unwrap()
    }

    fn round_trip_server(msg: ServerMessage) -> ServerMessage {
        let encoded = msg.encode().unwrap();
        let (header, payload, _) = try_parse_frame(&encoded).unwrap().unwrap();
        ServerMessage::decode(header.msg_type, payload).unwrap()
    }

    #[test]
    fn hello_round_trips() {
        let msg = ClientMessage::Hello {
            name: "Astra".into(),
        };
        assert_eq!(round_trip_client(msg.clone()), msg);
    }

    #[test]
    fn create_room_round_trips() {
        let msg = ClientMessage::CreateRoom {
            capacity: 4,
            name: "derelict-run".into(),
        };
        assert_eq!(round_trip_client(msg.clone()), msg);
    }

    #[test]
    fn join_ack_round_trips_with_members() {
        let msg = ServerMessage::JoinAck {
            room_id: 7,
            your_seat: 2,
            members: vec![NameInfo {
                seat: 1,
                ready: true,
                name: "A".into(),
            }],
        };
        assert_eq!(round_trip_server(msg.clone()), msg);
    }

    #[test]
    fn list_rooms_resp_round_trips() {
        let msg = ServerMessage::ListRoomsResp {
            rooms: vec![RoomInfo {
                room_id: 1,
                count: 1,
                capacity: 4,
                name: "room".into(),
                status: RoomStatus::Waiting,
            }],
        };
        assert_eq!(round_trip_server(msg.clone()), msg);
    }

    #[test]
    fn unknown_type_errors() {
        assert!(matches!(
            ClientMessage::decode(0xAB, &[]),
            Err(CodecError::UnknownType(0xAB))
        ));
    }
}
