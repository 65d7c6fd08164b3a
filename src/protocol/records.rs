//! Fixed-width records embedded in lobby messages: `NameInfo` and `RoomInfo`.

use byteorder::{BigEndian, ByteOrder};

use crate::error::CodecError;
use crate::lobby::room::RoomStatus;

/// Maximum length, in bytes, of a player display name.
pub const MAX_NAME_LENGTH: usize = 60;

/// Maximum length, in bytes, of a room name.
pub const MAX_ROOM_NAME_LENGTH: usize = 32;

/// On-wire size of a [`NameInfo`] record.
pub const NAME_INFO_SIZE: usize = 64;

/// On-wire size of a [`RoomInfo`] record.
pub const ROOM_INFO_SIZE: usize = 40;

/// A room member's seat, readiness, and display name.
///
/// Layout: `[seat:u8][ready:u8][name_len:u16][name:60 bytes, NUL-padded]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameInfo {
    pub seat: u8,
    pub ready: bool,
    pub name: String,
}

impl NameInfo {
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let name_bytes = self.name.as_bytes();
        if name_bytes.len() > MAX_NAME_LENGTH {
            return Err(CodecError::FieldTooLong {
                field: "name",
                actual: name_bytes.len(),
                max: MAX_NAME_LENGTH,
            });
        }
        out.push(self.seat);
        out.push(u8::from(self.ready));
        let mut len_buf = [0u8; 2];
        BigEndian::write_u16(&mut len_buf, name_bytes.len() as u16);
        out.extend_from_slice(&len_buf);
        out.extend_from_slice(name_bytes);
        out.resize(out.len() + (MAX_NAME_LENGTH - name_bytes.len()), 0);
        Ok(())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < NAME_INFO_SIZE {
            return Err(CodecError::LengthMismatch {
                declared: NAME_INFO_SIZE,
                actual: buf.len(),
            });
        }
        let seat = buf[0];
        let ready = buf[1] != 0;
        let name_len = BigEndian::read_u16(&buf[2..4]) as usize;
        if name_len > MAX_NAME_LENGTH {
            return Err(CodecError::FieldTooLong {
                field: "name",
                actual: name_len,
                max: MAX_NAME_LENGTH,
            });
        }
        let name = String::from_utf8_lossy(&buf[4..4 + name_len]).into_owned();
        Ok(Self { seat, ready, name })
    }
}

/// A room's identity, occupancy, and status, as advertised to clients.
///
/// Layout: `[room_id:u16][count:u8][capacity:u8][name_len:u16][name:32 bytes,
/// NUL-padded][status:u8][reserved:3 bytes]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: u16,
    pub count: u8,
    pub capacity: u8,
    pub name: String,
    pub status: RoomStatus,
}

impl RoomInfo {
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let name_bytes = self.name.as_bytes();
        if name_bytes.len() > MAX_ROOM_NAME_LENGTH {
            return Err(CodecError::FieldTooLong {
                field: "room name",
                actual: name_bytes.len(),
                max: MAX_ROOM_NAME_LENGTH,
            });
        }
        let mut room_id_buf = [0u8; 2];
        BigEndian::write_u16(&mut room_id_buf, self.room_id);
        out.extend_from_slice(&room_id_buf);
        out.push(self.count);
        out.push(self.capacity);
        let mut len_buf = [0u8; 2];
        BigEndian::write_u16(&mut len_buf, name_bytes.len() as u16);
        out.extend_from_slice(&len_buf);
        out.extend_from_slice(name_bytes);
        out.resize(out.len() + (MAX_ROOM_NAME_LENGTH - name_bytes.len()), 0);
        out.push(self.status.wire_byte());
        out.extend_from_slice(&[0u8; 3]);
        Ok(())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < ROOM_INFO_SIZE {
            return Err(CodecError::LengthMismatch {
                declared: ROOM_INFO_SIZE,
                actual: buf.len(),
            });
        }
        let room_id = BigEndian::read_u16(&buf[0..2]);
        let count = buf[2];
        let capacity = buf[3];
        let name_len = BigEndian::read_u16(&buf[4..6]) as usize;
        if name_len > MAX_ROOM_NAME_LENGTH {
            return Err(CodecError::FieldTooLong {
                field: "room name",
                actual: name_len,
                max: MAX_ROOM_NAME_LENGTH,
            });
        }
        let name = String::from_utf8_lossy(&buf[6..6 + name_len]).into_owned();
        let status_byte = buf[6 + MAX_ROOM_NAME_LENGTH];
        let status = RoomStatus::from_wire_byte(status_byte).ok_or(CodecError::UnknownType(status_byte))?;
        Ok(Self {
            room_id,
            count,
            capacity,
            name,
            status,
        })
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
    fn name_info_round_trips() {
        let info = NameInfo {
            seat: 2,
            ready: true,
            name: "Astra".to_string(),
        };
        let mut buf = Vec::new();
        info.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), NAME_INFO_SIZE);
        assert_eq!(NameInfo::decode(&buf).unwrap(), info);
    }

    #[test]
    fn room_info_round_trips() {
        let info = RoomInfo {
            room_id: 42,
            count: 2,
            capacity: 4,
            name: "derelict-run".to_string(),
            status: RoomStatus::Ready,
        };
        let mut buf = Vec::new();
        info.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), ROOM_INFO_SIZE);
        assert_eq!(RoomInfo::decode(&buf).unwrap(), info);
    }

    #[test]
    fn name_too_long_is_rejected() {
        let info = NameInfo {
            seat: 1,
            ready: false,
            name: "x".repeat(MAX_NAME_LENGTH + 1),
        };
        let mut buf = Vec::new();
        assert!(info.encode(&mut buf).is_err());
    }
}
