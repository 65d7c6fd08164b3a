//! Datagram-channel message types: the game simulation wire protocol.

use byteorder::{BigEndian, ByteOrder};

use crate::error::CodecError;
use crate::protocol::frame::{encode_datagram, read_f32, write_f32};
use crate::simulation::entity::EntityKind;

/// Datagram message type bytes.
pub mod msg_type {
    pub const CLIENT_PING: u8 = 0x00;
    pub const PLAYER_ASSIGNMENT: u8 = 0x01;
    pub const ENTITY_CREATE: u8 = 0x10;
    pub const ENTITY_UPDATE: u8 = 0x11;
    pub const ENTITY_DESTROY: u8 = 0x12;
    pub const GAME_STATE: u8 = 0x13;
    pub const PLAYER_INPUT: u8 = 0x20;
}

/// Bit positions within the [`ClientDatagram::PlayerInput`] direction mask.
pub mod input_bit {
    pub const UP: u8 = 1 << 0;
    pub const DOWN: u8 = 1 << 1;
    pub const LEFT: u8 = 1 << 2;
    pub const RIGHT: u8 = 1 << 3;
    pub const FIRE: u8 = 1 << 4;
}

/// Datagrams a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientDatagram {
    ClientPing { timestamp: u32, seat: u8 },
    PlayerInput { direction: u8 },
}

/// A single entity's broadcast state: net id, health, and position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityState {
    pub net_id: u32,
    pub health: u32,
    pub pos_x: f32,
    pub pos_y: f32,
}

/// Datagrams the server may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerDatagram {
    PlayerAssignment { net_id: u32 },
    EntityCreate {
        net_id: u32,
        kind: EntityKind,
        health: u32,
        pos_x: f32,
        pos_y: f32,
    },
    EntityUpdate { entities: Vec<EntityState> },
    EntityDestroy { net_id: u32 },
    GameState { score: u32 },
}

impl ClientDatagram {
    pub fn decode(msg_type: u8, payload: &[u8]) -> Result<Self, CodecError> {
        match msg_type {
            msg_type::CLIENT_PING => {
                if payload.len() < 5 {
                    return Err(CodecError::LengthMismatch {
                        declared: 5,
                        actual: payload.len(),
                    });
                }
                Ok(Self::ClientPing {
                    timestamp: BigEndian::read_u32(&payload[0..4]),
                    seat: payload[4],
                })
            }
            msg_type::PLAYER_INPUT => {
                if payload.len() < 2 {
                    return Err(CodecError::LengthMismatch {
                        declared: 2,
                        actual: payload.len(),
                    });
                }
                Ok(Self::PlayerInput { direction: payload[1] })
            }
            other => Err(CodecError::UnknownType(other)),
        }
    }

    pub fn encode(&self, seq: u32) -> Vec<u8> {
        match self {
            Self::ClientPing { timestamp, seat } => {
                let mut payload = [0u8; 5];
                BigEndian::write_u32(&mut payload[0..4], *timestamp);
                payload[4] = *seat;
                encode_datagram(msg_type::CLIENT_PING, seq, &payload)
            }
            Self::PlayerInput { direction } => {
                encode_datagram(msg_type::PLAYER_INPUT, seq, &[0u8, *direction])
            }
        }
    }
}

impl ServerDatagram {
    pub fn decode(msg_type: u8, payload: &[u8]) -> Result<Self, CodecError> {
        match msg_type {
            msg_type::PLAYER_ASSIGNMENT => {
                if payload.len() < 4 {
                    return Err(CodecError::LengthMismatch {
                        declared: 4,
                        actual: payload.len(),
                    });
                }
                Ok(Self::PlayerAssignment {
                    net_id: BigEndian::read_u32(&payload[0..4]),
                })
            }
            msg_type::ENTITY_CREATE => {
                if payload.len() < 17 {
                    return Err(CodecError::LengthMismatch {
                        declared: 17,
                        actual: payload.len(),
                    });
                }
                let net_id = BigEndian::read_u32(&payload[0..4]);
                let kind = EntityKind::from_wire_byte(payload[4])
                    .ok_or(CodecError::UnknownType(payload[4]))?;
                let health = BigEndian::read_u32(&payload[5..9]);
                let pos_x = read_f32(payload, 9);
                let pos_y = read_f32(payload, 13);
                Ok(Self::EntityCreate {
                    net_id,
                    kind,
                    health,
                    pos_x,
                    pos_y,
                })
            }
            msg_type::ENTITY_UPDATE => {
                if payload.len() < 2 {
                    return Err(CodecError::LengthMismatch {
                        declared: 2,
                        actual: payload.len(),
                    });
                }
                let count = BigEndian::read_u16(&payload[0..2]) as usize;
                let mut entities = Vec::with_capacity(count);
                let mut offset = 2;
                for _ in 0..count {
                    if payload.len() < offset + 16 {
                        return Err(CodecError::LengthMismatch {
                            declared: offset + 16,
                            actual: payload.len(),
                        });
                    }
                    entities.push(EntityState {
                        net_id: BigEndian::read_u32(&payload[offset..offset + 4]),
                        health: BigEndian::read_u32(&payload[offset + 4..offset + 8]),
                        pos_x: read_f32(payload, offset + 8),
                        pos_y: read_f32(payload, offset + 12),
                    });
                    offset += 16;
                }
                Ok(Self::EntityUpdate { entities })
            }
            msg_type::ENTITY_DESTROY => {
                if payload.len() < 4 {
                    return Err(CodecError::LengthMismatch {
                        declared: 4,
                        actual: payload.len(),
                    });
                }
                Ok(Self::EntityDestroy {
                    net_id: BigEndian::read_u32(&payload[0..4]),
                })
            }
            msg_type::GAME_STATE => {
                if payload.len() < 4 {
                    return Err(CodecError::LengthMismatch {
                        declared: 4,
                        actual: payload.len(),
                    });
                }
                Ok(Self::GameState {
                    score: BigEndian::read_u32(&payload[0..4]),
                })
            }
            other => Err(CodecError::UnknownType(other)),
        }
    }

    pub fn encode(&self, seq: u32) -> Vec<u8> {
        match self {
            Self::PlayerAssignment { net_id } => {
                let mut payload = [0u8; 4];
                BigEndian::write_u32(&mut payload, *net_id);
                encode_datagram(msg_type::PLAYER_ASSIGNMENT, seq, &payload)
            }
            Self::EntityCreate {
                net_id,
                kind,
                health,
                pos_x,
                pos_y,
            } => {
                let mut payload = Vec::with_capacity(17);
                let mut buf4 = [0u8; 4];
                BigEndian::write_u32(&mut buf4, *net_id);
                payload.extend_from_slice(&buf4);
                payload.push(kind.wire_byte());
                BigEndian::write_u32(&mut buf4, *health);
                payload.extend_from_slice(&buf4);
                write_f32(&mut payload, *pos_x);
                write_f32(&mut payload, *pos_y);
                encode_datagram(msg_type::ENTITY_CREATE, seq, &payload)
            }
            Self::EntityUpdate { entities } => {
                let mut payload = Vec::with_capacity(2 + entities.len() * 16);
                let mut buf2 = [0u8; 2];
                BigEndian::write_u16(&mut buf2, entities.len() as u16);
                payload.extend_from_slice(&buf2);
                let mut buf4 = [0u8; 4];
                for e in entities {
                    BigEndian::write_u32(&mut buf4, e.net_id);
                    payload.extend_from_slice(&buf4);
                    BigEndian::write_u32(&mut buf4, e.health);
                    payload.extend_from_slice(&buf4);
                    write_f32(&mut payload, e.pos_x);
                    write_f32(&mut payload, e.pos_y);
                }
                encode_datagram(msg_type::ENTITY_UPDATE, seq, &payload)
            }
            Self::EntityDestroy { net_id } => {
                let mut payload = [0u8; 4];
                BigEndian::write_u32(&mut payload, *net_id);
                encode_datagram(msg_type::ENTITY_DESTROY, seq, &payload)
            }
            Self::GameState { score } => {
                let mut payload = [0u8; 4];
                BigEndian::write_u32(&mut payload, *score);
                encode_datagram(msg_type::GAME_STATE, seq, &payload)
            }
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
    use crate::protocol::frame::parse_datagram;

    fn round_trip_client(msg: ClientDatagram) -> ClientDatagram {
        let encoded = msg.encode(0);
        let (header, _seq, payload) = parse_datagram(&encoded).unwrap();
        ClientDatagram::decode(header.msg_type, payload).unwrap()
    }

    fn round_trip_server(msg: ServerDatagram) -> ServerDatagram {
        let encoded = msg.encode(0);
        let (header, _seq, payload) = parse_datagram(&encoded).unwrap();
        ServerDatagram::decode(header.msg_type, payload).unwrap()
    }

    #[test]
    fn client_ping_round_trips() {
        let msg = ClientDatagram::ClientPing {
            timestamp: 1234,
            seat: 2,
        };
        assert_eq!(round_trip_client(msg), msg);
    }

    #[test]
    fn player_input_round_trips() {
        let msg = ClientDatagram::PlayerInput {
            direction: input_bit::RIGHT | input_bit::FIRE,
        };
        assert_eq!(round_trip_client(msg), msg);
    }

    #[test]
    fn entity_create_round_trips() {
        let msg = ServerDatagram::EntityCreate {
            net_id: 7,
            kind: EntityKind::Boss,
            health: 1000,
            pos_x: 0.85,
            pos_y: 0.5,
        };
        assert_eq!(round_trip_server(msg), msg);
    }

    #[test]
    fn entity_update_round_trips_with_multiple_entities() {
        let msg = ServerDatagram::EntityUpdate {
            entities: vec![
                EntityState {
                    net_id: 1,
                    health: 100,
                    pos_x: 0.1,
                    pos_y: 0.2,
                },
                EntityState {
                    net_id: 2,
                    health: 50,
                    pos_x: 0.3,
                    pos_y: 0.4,
                },
            ],
        };
        assert_eq!(round_trip_server(msg), msg);
    }
}
