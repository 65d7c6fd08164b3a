//! The lobby/matchmaking control plane (spec component C4).

pub mod client;
pub mod manager;
pub mod room;

pub use client::{ClientRecord, ClientState};
pub use manager::{JoinedRoom, LobbyManager};
pub use room::{RoomRecord, RoomStatus};
