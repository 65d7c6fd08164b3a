//! Room records: membership, seating, and readiness.

pub const MIN_CAPACITY: u8 = 2;
pub const MAX_CAPACITY: u8 = 4;
pub const MAX_ROOM_NAME_LENGTH: usize = 31;

/// Lifecycle state of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Ready,
    InGame,
    Closing,
}

impl RoomStatus {
    pub fn wire_byte(self) -> u8 {
        match self {
            Self::Waiting => 0x00,
            Self::Ready => 0x01,
            Self::InGame => 0x02,
            Self::Closing => 0x03,
        }
    }

    pub fn from_wire_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Waiting),
            0x01 => Some(Self::Ready),
            0x02 => Some(Self::InGame),
            0x03 => Some(Self::Closing),
            _ => None,
        }
    }
}

/// A single member's seat within a room.
#[derive(Debug, Clone)]
pub struct Slot {
    pub client_id: u64,
    pub seat: u8,
    pub name: String,
    pub ready: bool,
}

/// A matchmaking room: identity, capacity, and seated members.
#[derive(Debug, Clone)]
pub struct RoomRecord {
    pub room_id: u16,
    pub name: String,
    pub capacity: u8,
    pub status: RoomStatus,
    slots: Vec<Slot>,
}

impl RoomRecord {
    pub fn new(room_id: u16, name: String, capacity: u8) -> Self {
        Self {
            room_id,
            name,
            capacity,
            status: RoomStatus::Waiting,
            slots: Vec::new(),
        }
    }

    pub fn members(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity as usize
    }

    pub fn contains(&self, client_id: u64) -> bool {
        self.slots.iter().any(|s| s.client_id == client_id)
    }

    /// Smallest unused seat in `1..=capacity`, or `None` if full.
    fn next_free_seat(&self) -> Option<u8> {
        (1..=self.capacity).find(|seat| !self.slots.iter().any(|s| s.seat == *seat))
    }

    /// Seat `client_id` with `name`, returning the assigned seat.
    ///
    /// The caller must have already verified the room is not full and the
    /// client is not already a member.
    pub fn insert(&mut self, client_id: u64, name: String) -> Option<u8> {
        let seat = self.next_free_seat()?;
        self.slots.push(Slot {
            client_id,
            seat,
            name,
            ready: false,
        });
        self.recompute_status();
        Some(seat)
    }

    /// Remove `client_id` from the room, returning its former seat if present.
    pub fn remove(&mut self, client_id: u64) -> Option<u8> {
        let idx = self.slots.iter().position(|s| s.client_id == client_id)?;
        let seat = self.slots.remove(idx).seat;
        self.recompute_status();
        Some(seat)
    }

    pub fn set_ready(&mut self, client_id: u64, ready: bool) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.client_id == client_id) else {
            return false;
        };
        slot.ready = ready;
        self.recompute_status();
        true
    }

    pub fn can_start(&self) -> bool {
        matches!(self.status, RoomStatus::Waiting | RoomStatus::Ready)
            && self.slots.len() >= MIN_CAPACITY as usize
            && self.slots.iter().all(|s| s.ready)
    }

    pub fn start(&mut self) {
        self.status = RoomStatus::InGame;
    }

    fn recompute_status(&mut self) {
        if matches!(self.status, RoomStatus::InGame | RoomStatus::Closing) {
            return;
        }
        let all_ready = self.slots.len() >= MIN_CAPACITY as usize && self.slots.iter().all(|s| s.ready);
        self.status = if all_ready {
            RoomStatus::Ready
        } else {
            RoomStatus::Waiting
        };
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
    fn seats_fill_smallest_free_value() {
        let mut room = RoomRecord::new(1, "test".into(), 4);
        assert_eq!(room.insert(10, "a".into()), Some(1));
        assert_eq!(room.insert(11, "b".into()), Some(2));
        room.remove(10);
        assert_eq!(room.insert(12, "c".into()), Some(1));
    }

    #[test]
    fn status_tracks_readiness() {
        let mut room = RoomRecord::new(1, "test".into(), 2);
        room.insert(1, "a".into());
        assert_eq!(room.status, RoomStatus::Waiting);
        room.set_ready(1, true);
        // Only one of two members ready.
        assert_eq!(room.status, RoomStatus::Waiting);
        room.insert(2, "b".into());
        room.set_ready(2, true);
        assert_eq!(room.status, RoomStatus::Ready);
        assert!(room.can_start());
    }

    #[test]
    fn full_room_rejects_insert() {
        let mut room = RoomRecord::new(1, "test".into(), 2);
        room.insert(1, "a".into());
        room.insert(2, "b".into());
        assert!(room.is_full());
        assert_eq!(room.insert(3, "c".into()), None);
    }
}
