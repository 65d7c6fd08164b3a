//! The lobby session manager: the control-plane state machine tying clients
//! to rooms.
//!
//! All operations here are synchronous and infallible with respect to
//! concurrency — callers (the dispatcher) are expected to hold the manager
//! behind a single lock for the duration of one message's handling, per the
//! "never hold more than one of the room/client/entity locks" rule.

use std::collections::HashMap;

use crate::error_codes::ErrorCode;
use crate::lobby::client::{validate_name, ClientRecord, ClientState, MAX_NAME_LENGTH};
use crate::lobby::room::{RoomRecord, RoomStatus, MAX_CAPACITY, MAX_ROOM_NAME_LENGTH, MIN_CAPACITY};

/// Outcome of a successful room join.
#[derive(Debug, Clone)]
pub struct JoinedRoom {
    pub room_id: u16,
    pub seat: u8,
    /// Existing members at the moment of joining (not including the joiner).
    pub existing_members: Vec<(u8, String, bool)>,
}

/// The in-memory lobby: clients, rooms, and the glue between them.
#[derive(Debug, Default)]
pub struct LobbyManager {
    clients: HashMap<u64, ClientRecord>,
    rooms: HashMap<u16, RoomRecord>,
    next_room_id: u16,
}

impl LobbyManager {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            rooms: HashMap::new(),
            next_room_id: 1,
        }
    }

    pub fn add_client(&mut self, client_id: u64, name: String) -> Result<(), ErrorCode> {
        if !validate_name(&name, MAX_NAME_LENGTH) {
            return Err(ErrorCode::InvalidName);
        }
        self.clients
            .insert(client_id, ClientRecord::new(client_id, name));
        Ok(())
    }

    pub fn remove_client(&mut self, client_id: u64) {
        if let Some(client) = self.clients.remove(&client_id) {
            if let Some(room_id) = client.room_id {
                self.leave_room_inner(client_id, room_id);
            }
        }
    }

    pub fn client_state(&self, client_id: u64) -> Option<ClientState> {
        self.clients.get(&client_id).map(|c| c.state)
    }

    pub fn client_room(&self, client_id: u64) -> Option<u16> {
        self.clients.get(&client_id).and_then(|c| c.room_id)
    }

    pub fn create_room(
        &mut self,
        creator: u64,
        name: String,
        capacity: u8,
    ) -> Result<u16, ErrorCode> {
        let Some(client) = self.clients.get(&creator) else {
            return Err(ErrorCode::Internal);
        };
        if client.room_id.is_some() {
            return Err(ErrorCode::AlreadyInRoom);
        }
        if !validate_name(&name, MAX_ROOM_NAME_LENGTH) {
            return Err(ErrorCode::InvalidName);
        }
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(ErrorCode::Internal);
        }

        let room_id = self.next_room_id;
        self.next_room_id = self.next_room_id.wrapping_add(1).max(1);

        let mut room = RoomRecord::new(room_id, name, capacity);
        let client_name = client.name.clone();
        room.insert(creator, client_name);
        self.rooms.insert(room_id, room);

        if let Some(client) = self.clients.get_mut(&creator) {
            client.room_id = Some(room_id);
        }
        Ok(room_id)
    }

    pub fn join_room(&mut self, client_id: u64, room_id: u16) -> Result<JoinedRoom, ErrorCode> {
        let Some(client) = self.clients.get(&client_id) else {
            return Err(ErrorCode::Internal);
        };
        if client.room_id.is_some() {
            return Err(ErrorCode::AlreadyInRoom);
        }
        let client_name = client.name.clone();

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Err(ErrorCode::RoomNotFound);
        };
        if !matches!(room.status, RoomStatus::Waiting | RoomStatus::Ready) {
            return Err(ErrorCode::AlreadyStarted);
        }
        if room.is_full() {
            return Err(ErrorCode::RoomFull);
        }

        let existing_members = room
            .members()
            .iter()
            .map(|s| (s.seat, s.name.clone(), s.ready))
            .collect();

        let Some(seat) = room.insert(client_id, client_name) else {
            return Err(ErrorCode::RoomFull);
        };

        if let Some(client) = self.clients.get_mut(&client_id) {
            client.room_id = Some(room_id);
        }

        Ok(JoinedRoom {
            room_id,
            seat,
            existing_members,
        })
    }

    /// Remove `client_id` from its current room, if any. Returns the seat it
    /// held and the room id, and deletes the room if it becomes empty.
    pub fn leave_room(&mut self, client_id: u64) -> Option<(u16, u8)> {
        let room_id = self.clients.get(&client_id)?.room_id?;
        let seat = self.leave_room_inner(client_id, room_id)?;
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.room_id = None;
        }
        Some((room_id, seat))
    }

    fn leave_room_inner(&mut self, client_id: u64, room_id: u16) -> Option<u8> {
        let room = self.rooms.get_mut(&room_id)?;
        let seat = room.remove(client_id)?;
        if room.is_empty() {
            self.rooms.remove(&room_id);
        }
        Some(seat)
    }

    pub fn set_ready(&mut self, client_id: u64, ready: bool) -> Result<u16, ErrorCode> {
        let room_id = self
            .clients
            .get(&client_id)
            .and_then(|c| c.room_id)
            .ok_or(ErrorCode::NotInRoom)?;
        let room = self.rooms.get_mut(&room_id).ok_or(ErrorCode::RoomNotFound)?;
        room.set_ready(client_id, ready);
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.state = if ready {
                ClientState::Ready
            } else {
                ClientState::Connected
            };
        }
        Ok(room_id)
    }

    pub fn can_start(&self, room_id: u16) -> bool {
        self.rooms.get(&room_id).is_some_and(RoomRecord::can_start)
    }

    /// Mark the room in-game and every member's client state as in-game.
    /// Returns the seated membership at the moment of start.
    pub fn start_game(&mut self, room_id: u16) -> Option<Vec<(u64, u8)>> {
        let room = self.rooms.get_mut(&room_id)?;
        room.start();
        let members: Vec<(u64, u8)> = room.members().iter().map(|s| (s.client_id, s.seat)).collect();
        for (client_id, _) in &members {
            if let Some(client) = self.clients.get_mut(client_id) {
                client.state = ClientState::InGame;
            }
        }
        Some(members)
    }

    pub fn room(&self, room_id: u16) -> Option<&RoomRecord> {
        self.rooms.get(&room_id)
    }

    /// Rooms still open for matchmaking, in ascending id order.
    pub fn list_open_rooms(&self) -> Vec<&RoomRecord> {
        let mut rooms: Vec<&RoomRecord> = self
            .rooms
            .values()
            .filter(|r| matches!(r.status, RoomStatus::Waiting | RoomStatus::Ready))
            .collect();
        rooms.sort_by_key(|r| r.room_id);
        rooms
    }

    /// Other members of `room_id`, excluding `except`. Used to build
    /// broadcast recipient lists without holding the lock during I/O.
    pub fn room_members_except(&self, room_id: u16, except: u64) -> Vec<u64> {
        self.rooms
            .get(&room_id)
            .map(|r| {
                r.members()
                    .iter()
                    .map(|s| s.client_id)
                    .filter(|id| *id != except)
                    .collect()
            })
            .unwrap_or_default()
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

    fn setup_pair(mgr: &mut LobbyManager) -> u16 {
        mgr.add_client(1, "A".into()).unwrap();
        mgr.add_client(2, "B".into()).unwrap();
        let room_id = mgr.create_room(1, "room".into(), 2).unwrap();
        mgr.join_room(2, room_id).unwrap();
        room_id
    }

    #[test]
    fn client_belongs_to_at_most_one_room() {
        let mut mgr = LobbyManager::new();
        let room_id = setup_pair(&mut mgr);
        assert_eq!(mgr.create_room(1, "another".into(), 2), Err(ErrorCode::AlreadyInRoom));
        assert_eq!(mgr.client_room(2), Some(room_id));
    }

    #[test]
    fn remove_client_cleans_up_solo_room() {
        let mut mgr = LobbyManager::new();
        mgr.add_client(1, "A".into()).unwrap();
        let room_id = mgr.create_room(1, "room".into(), 2).unwrap();
        mgr.remove_client(1);
        assert!(mgr.room(room_id).is_none());
    }

    #[test]
    fn ready_flips_room_status_and_allows_start() {
        let mut mgr = LobbyManager::new();
        let room_id = setup_pair(&mut mgr);
        mgr.set_ready(1, true).unwrap();
        assert!(!mgr.can_start(room_id));
        mgr.set_ready(2, true).unwrap();
        assert!(mgr.can_start(room_id));
        let members = mgr.start_game(room_id).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(mgr.client_state(1), Some(ClientState::InGame));
    }

    #[test]
    fn third_join_to_full_room_is_rejected() {
        let mut mgr = LobbyManager::new();
        let room_id = setup_pair(&mut mgr);
        mgr.add_client(3, "C".into()).unwrap();
        assert_eq!(mgr.join_room(3, room_id), Err(ErrorCode::RoomFull));
    }
}
