//! The protocol dispatcher (spec component C5): the single task that owns
//! the lobby session manager and turns reliable-channel frames into lobby
//! operations, replies, and broadcasts.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bridge::SessionBridge;
use crate::error_codes::ErrorCode;
use crate::event::RoomEvent;
use crate::lobby::client::ClientState;
use crate::lobby::manager::LobbyManager;
use crate::lobby::room::RoomRecord;
use crate::protocol::messages::{is_known_client_type, ClientMessage, ServerMessage};
use crate::protocol::records::{NameInfo, RoomInfo};
use crate::shutdown::ShutdownWatch;
use crate::transport::reliable::{ReliableEvent, ReliableTransport};

/// Ties the lobby state machine to a reliable transport and a session bridge.
pub struct Dispatcher {
    lobby: LobbyManager,
    transport: Arc<ReliableTransport>,
    bridge: SessionBridge,
    server_id: u16,
    server_ip: u32,
}

impl Dispatcher {
    pub fn new(transport: Arc<ReliableTransport>, bridge: SessionBridge, server_id: u16, server_ip: u32) -> Self {
        Self {
            lobby: LobbyManager::new(),
            transport,
            bridge,
            server_id,
            server_ip,
        }
    }

    /// Drain reliable-channel events until `shutdown` fires.
    pub async fn run(mut self, mut events: tokio::sync::mpsc::UnboundedReceiver<ReliableEvent>, mut shutdown: ShutdownWatch) {
        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.handle_event(event).await;
                }
            }
        }
    }

    async fn handle_event(&mut self, event: ReliableEvent) {
        match event {
            ReliableEvent::Connected { client_id, peer_addr } => {
                info!(client_id, %peer_addr, "reliable channel connected");
            }
            ReliableEvent::Frame {
                client_id,
                msg_type,
                payload,
            } => {
                self.handle_frame(client_id, msg_type, &payload).await;
            }
            ReliableEvent::Disconnected { client_id } => {
                self.handle_disconnect(client_id).await;
            }
        }
    }

    async fn handle_disconnect(&mut self, client_id: u64) {
        if let Some((room_id, seat)) = self.lobby.leave_room(client_id) {
            self.broadcast_to_room(room_id, client_id, RoomEvent::MemberLeft { seat }).await;
        }
        self.lobby.remove_client(client_id);
        info!(client_id, "reliable channel disconnected");
    }

    async fn handle_frame(&mut self, client_id: u64, msg_type: u8, payload: &[u8]) {
        if !is_known_client_type(msg_type) {
            self.reply(client_id, ServerMessage::ProtocolError { error: ErrorCode::ProtocolViolation })
                .await;
            return;
        }
        let message = match ClientMessage::decode(msg_type, payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(client_id, error = %e, "malformed frame");
                self.reply(client_id, ServerMessage::ProtocolError { error: ErrorCode::ProtocolViolation })
                    .await;
                return;
            }
        };

        if !self.allowed(client_id, &message) {
            self.reply(client_id, ServerMessage::ProtocolError { error: ErrorCode::UnexpectedMessage })
                .await;
            return;
        }

        match message {
            ClientMessage::Hello { name } => self.on_hello(client_id, name).await,
            ClientMessage::ListRooms => self.on_list_rooms(client_id).await,
            ClientMessage::RoomInfo { room_id } => self.on_room_info(client_id, room_id).await,
            ClientMessage::CreateRoom { capacity, name } => self.on_create_room(client_id, capacity, name).await,
            ClientMessage::JoinRoom { room_id } => self.on_join_room(client_id, room_id).await,
            ClientMessage::LeaveRoom => self.on_leave_room(client_id).await,
            ClientMessage::Ready { ready } => self.on_ready(client_id, ready).await,
        }
    }

    /// Table in §4.5: which messages a client may send in its current state.
    fn allowed(&self, client_id: u64, message: &ClientMessage) -> bool {
        let Some(state) = self.lobby.client_state(client_id) else {
            return matches!(message, ClientMessage::Hello { .. });
        };
        if matches!(message, ClientMessage::Hello { .. }) {
            return false;
        }
        let in_room = self.lobby.client_room(client_id).is_some();
        match state {
            ClientState::InGame => false,
            ClientState::Connected if !in_room => {
                matches!(
                    message,
                    ClientMessage::ListRooms | ClientMessage::CreateRoom { .. } | ClientMessage::JoinRoom { .. }
                )
            }
            ClientState::Connected => matches!(
                message,
                ClientMessage::ListRooms
                    | ClientMessage::RoomInfo { .. }
                    | ClientMessage::LeaveRoom
                    | ClientMessage::Ready { .. }
            ),
            ClientState::Ready => matches!(
                message,
                ClientMessage::ListRooms
                    | ClientMessage::RoomInfo { .. }
                    | ClientMessage::LeaveRoom
                    | ClientMessage::Ready { .. }
            ),
        }
    }

    async fn on_hello(&mut self, client_id: u64, name: String) {
        match self.lobby.add_client(client_id, name) {
            Ok(()) => self.reply(client_id, ServerMessage::HelloAck { seat: 0 }).await,
            Err(error) => self.reply(client_id, ServerMessage::HelloNak { error }).await,
        }
    }

    async fn on_list_rooms(&mut self, client_id: u64) {
        let rooms: Vec<RoomInfo> = self.lobby.list_open_rooms().into_iter().map(room_info).collect();
        self.reply(client_id, ServerMessage::ListRoomsResp { rooms }).await;
    }

    async fn on_room_info(&mut self, client_id: u64, room_id: u16) {
        match self.lobby.room(room_id) {
            Some(room) => {
                self.reply(client_id, ServerMessage::RoomInfoResp(room_info(room))).await;
            }
            None => {
                self.reply(
                    client_id,
                    ServerMessage::ProtocolError {
                        error: ErrorCode::RoomNotFound,
                    },
                )
                .await;
            }
        }
    }

    async fn on_create_room(&mut self, client_id: u64, capacity: u8, name: String) {
        match self.lobby.create_room(client_id, name, capacity) {
            Ok(room_id) => self.reply(client_id, ServerMessage::CreateAck { room_id }).await,
            Err(error) => self.reply(client_id, ServerMessage::ProtocolError { error }).await,
        }
    }

    async fn on_join_room(&mut self, client_id: u64, room_id: u16) {
        match self.lobby.join_room(client_id, room_id) {
            Ok(joined) => {
                let members = joined
                    .existing_members
                    .into_iter()
                    .map(|(seat, name, ready)| NameInfo { seat, ready, name })
                    .collect();
                self.reply(
                    client_id,
                    ServerMessage::JoinAck {
                        room_id,
                        your_seat: joined.seat,
                        members,
                    },
                )
                .await;

                if let Some(name) = self.lobby.room(room_id).and_then(|r| {
                    r.members().iter().find(|s| s.client_id == client_id).map(|s| s.name.clone())
                }) {
                    let event = RoomEvent::MemberJoined(NameInfo {
                        seat: joined.seat,
                        ready: false,
                        name,
                    });
                    self.broadcast_to_room(room_id, client_id, event).await;
                }
            }
            Err(error) => self.reply(client_id, ServerMessage::JoinNak { error }).await,
        }
    }

    async fn on_leave_room(&mut self, client_id: u64) {
        match self.lobby.leave_room(client_id) {
            Some((room_id, seat)) => {
                self.reply(client_id, ServerMessage::LeaveAck).await;
                self.broadcast_to_room(room_id, client_id, RoomEvent::MemberLeft { seat })
                    .await;
            }
            None => {
                self.reply(client_id, ServerMessage::ProtocolError { error: ErrorCode::NotInRoom })
                    .await;
            }
        }
    }

    async fn on_ready(&mut self, client_id: u64, ready: bool) {
        let room_id = match self.lobby.set_ready(client_id, ready) {
            Ok(room_id) => room_id,
            Err(error) => {
                self.reply(client_id, ServerMessage::ProtocolError { error }).await;
                return;
            }
        };

        if ready && self.lobby.can_start(room_id) {
            self.start_game(room_id).await;
        }
    }

    async fn start_game(&mut self, room_id: u16) {
        let Some(members) = self.lobby.start_game(room_id) else {
            return;
        };
        let seats: Vec<u8> = members.iter().map(|(_, seat)| *seat).collect();

        match self.bridge.start_room(&seats).await {
            Ok(info) => {
                let event = RoomEvent::GameStarting {
                    udp_port: info.udp_port,
                    server_id: self.server_id,
                    server_ip: self.server_ip,
                };
                for (member_client_id, _) in &members {
                    self.reply(*member_client_id, event.to_message()).await;
                }
            }
            Err(e) => {
                warn!(room_id, error = %e, "failed to start simulation for room");
                for (member_client_id, _) in &members {
                    self.reply(
                        *member_client_id,
                        ServerMessage::ProtocolError {
                            error: ErrorCode::Internal,
                        },
                    )
                    .await;
                }
            }
        }
    }

    async fn broadcast_to_room(&self, room_id: u16, except: u64, event: RoomEvent) {
        let recipients = self.lobby.room_members_except(room_id, except);
        let message = event.to_message();
        for recipient in recipients {
            self.reply(recipient, message.clone()).await;
        }
    }

    async fn reply(&self, client_id: u64, message: ServerMessage) {
        let bytes = match message.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(client_id, error = %e, "failed to encode reply");
                return;
            }
        };
        if !self.transport.send_to_client(client_id, bytes).await {
            warn!(client_id, "reply send failed, client likely disconnected");
        }
    }
}

fn room_info(room: &RoomRecord) -> RoomInfo {
    RoomInfo {
        room_id: room.room_id,
        count: room.len() as u8,
        capacity: room.capacity,
        name: room.name.clone(),
        status: room.status,
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
    use crate::lobby::room::RoomStatus;

    #[test]
    fn hello_allowed_only_before_a_client_record_exists() {
        let lobby = LobbyManager::new();
        let dispatcher_state = lobby.client_state(1);
        assert!(dispatcher_state.is_none());
    }

    #[test]
    fn room_info_maps_status_and_occupancy() {
        let mut room = RoomRecord::new(5, "derelict-run".into(), 4);
        room.insert(1, "A".into());
        let info = room_info(&room);
        assert_eq!(info.room_id, 5);
        assert_eq!(info.count, 1);
        assert_eq!(info.status, RoomStatus::Waiting);
    }
}
