//! Wire codec and message types for both channels (spec component C1).

pub mod datagram;
pub mod frame;
pub mod messages;
pub mod records;

pub use datagram::{ClientDatagram, ServerDatagram};
pub use messages::{ClientMessage, ServerMessage};
pub use records::{NameInfo, RoomInfo};
