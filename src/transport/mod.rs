//! Network transports: the reliable (TCP) lobby channel and the datagram
//! (UDP) simulation channel.

pub mod datagram;
pub mod reliable;

pub use datagram::{DatagramTransport, InboundDatagram};
pub use reliable::{ReliableEvent, ReliableTransport};
