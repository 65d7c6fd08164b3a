//! The datagram (UDP) transport (spec component C3).
//!
//! One socket serves every in-progress room; the bridge layer tells rooms
//! apart by the UDP port it bound for them. Endpoints are identified by
//! their `SocketAddr` as a string since a seat is not known until the
//! client's first `CLIENT_PING`.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::frame::parse_datagram;

const MAX_DATAGRAM_SIZE: usize = 1200;

/// One inbound packet, already split into its header and payload.
#[derive(Debug)]
pub struct InboundDatagram {
    pub from: String,
    pub msg_type: u8,
    pub seq: u32,
    pub payload: Vec<u8>,
}

/// A bound UDP socket plus the read pump feeding [`InboundDatagram`]s to a
/// caller-owned channel.
pub struct DatagramTransport {
    socket: Arc<UdpSocket>,
    recv_task: tokio::task::JoinHandle<()>,
}

impl DatagramTransport {
    /// Bind `port` (0 lets the OS choose) and start the read pump. Returns
    /// the transport handle, the receiver of inbound datagrams, and the
    /// bound local port.
    pub async fn bind(port: u16) -> std::io::Result<(Self, mpsc::UnboundedReceiver<InboundDatagram>, u16)> {
        let socket = Arc::new(UdpSocket::bind(("0.0.0.0", port)).await?);
        let local_port = socket.local_addr()?.port();
        debug!(port = local_port, "datagram channel bound");

        let (tx, rx) = mpsc::unbounded_channel();
        let recv_socket = Arc::clone(&socket);
        let recv_task = tokio::spawn(recv_loop(recv_socket, tx));

        Ok((Self { socket, recv_task }, rx, local_port))
    }

    /// Send an already-encoded datagram to `endpoint` (a `SocketAddr`
    /// string as produced by [`InboundDatagram::from`]).
    pub async fn send_to(&self, endpoint: &str, bytes: &[u8]) -> std::io::Result<()> {
        self.socket.send_to(bytes, endpoint).await?;
        Ok(())
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    pub fn shutdown(&self) {
        self.recv_task.abort();
    }
}

async fn recv_loop(socket: Arc<UdpSocket>, tx: mpsc::UnboundedSender<InboundDatagram>) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "datagram recv failed");
                continue;
            }
        };

        match parse_datagram(&buf[..len]) {
            Ok((header, seq, payload)) => {
                let datagram = InboundDatagram {
                    from: from.to_string(),
                    msg_type: header.msg_type,
                    seq,
                    payload: payload.to_vec(),
                };
                if tx.send(datagram).is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(%from, error = %e, "malformed datagram, dropping");
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
    use crate::protocol::frame::encode_datagram;
    use tokio::net::UdpSocket as StdUdpSocket;

    #[tokio::test]
    async fn receives_and_decodes_a_datagram() {
        let (transport, mut rx, port) = DatagramTransport::bind(0).await.unwrap();
        let client = StdUdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = format!("127.0.0.1:{port}");

        let packet = encode_datagram(0x00, 1, &[]);
        client.send_to(&packet, &server_addr).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.msg_type, 0x00);
        assert_eq!(received.seq, 1);
        assert!(received.payload.is_empty());

        transport.shutdown();
    }

    #[tokio::test]
    async fn send_to_reaches_the_client() {
        let (transport, _rx, _port) = DatagramTransport::bind(0).await.unwrap();
        let client = StdUdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client_addr = client.local_addr().unwrap().to_string();

        let packet = encode_datagram(0x21, 0, &[1, 2, 3]);
        transport.send_to(&client_addr, &packet).await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], packet.as_slice());

        transport.shutdown();
    }
}
