//! The reliable (TCP) transport (spec component C2).
//!
//! Accepts stream connections, assigns each a stable client id, and runs a
//! read pump per connection that reassembles length-prefixed frames and
//! forwards them on a single inbound channel. Writes go out through a
//! per-client channel so a slow client cannot block others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::protocol::frame::try_parse_frame;

/// One event surfaced by the reliable transport's accept/read loops.
#[derive(Debug)]
pub enum ReliableEvent {
    Connected { client_id: u64, peer_addr: String },
    Frame { client_id: u64, msg_type: u8, payload: Vec<u8> },
    Disconnected { client_id: u64 },
}

struct ClientHandle {
    write_tx: mpsc::UnboundedSender<Vec<u8>>,
}

/// Owns the listening socket and the per-client write channels.
pub struct ReliableTransport {
    clients: Arc<Mutex<HashMap<u64, ClientHandle>>>,
    accept_task: tokio::task::JoinHandle<()>,
    local_port: u16,
}

impl ReliableTransport {
    /// Bind `port` (0 lets the OS choose) and start accepting connections.
    /// Returns the transport handle plus a receiver of [`ReliableEvent`]s.
    pub async fn bind(port: u16) -> std::io::Result<(Self, mpsc::UnboundedReceiver<ReliableEvent>)> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        let local_port = listener.local_addr()?.port();
        info!(port = local_port, "reliable channel listening");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let clients: Arc<Mutex<HashMap<u64, ClientHandle>>> = Arc::new(Mutex::new(HashMap::new()));
        let next_client_id = Arc::new(AtomicU64::new(1));

        let accept_clients = Arc::clone(&clients);
        let accept_next_id = Arc::clone(&next_client_id);
        let accept_task = tokio::spawn(accept_loop(listener, event_tx, accept_clients, accept_next_id));

        Ok((
            Self {
                clients,
                accept_task,
                local_port,
            },
            event_rx,
        ))
    }

    /// The port actually bound, useful when `bind` was called with `0`.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Send a complete, already-framed message to `client_id`. Returns
    /// `false` if the client is unknown or its write channel has closed.
    pub async fn send_to_client(&self, client_id: u64, bytes: Vec<u8>) -> bool {
        let clients = self.clients.lock().await;
        match clients.get(&client_id) {
            Some(handle) => handle.write_tx.send(bytes).is_ok(),
            None => false,
        }
    }

    /// Stop accepting new connections. Existing connections drain on their
    /// own read/write tasks.
    pub fn shutdown(&self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    event_tx: mpsc::UnboundedSender<ReliableEvent>,
    clients: Arc<Mutex<HashMap<u64, ClientHandle>>>,
    next_client_id: Arc<AtomicU64>,
) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        let client_id = next_client_id.fetch_add(1, Ordering::Relaxed);
        let peer_addr = addr.to_string();
        debug!(client_id, %peer_addr, "client connected");

        let (read_half, write_half) = stream.into_split();
        let (write_tx, write_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        clients.lock().await.insert(client_id, ClientHandle { write_tx });

        if event_tx
            .send(ReliableEvent::Connected {
                client_id,
                peer_addr,
            })
            .is_err()
        {
            return;
        }

        tokio::spawn(writer_loop(client_id, write_half, write_rx));
        let reader_clients = Arc::clone(&clients);
        let reader_event_tx = event_tx.clone();
        tokio::spawn(reader_loop(client_id, read_half, reader_event_tx, reader_clients));
    }
}

async fn reader_loop(
    client_id: u64,
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    event_tx: mpsc::UnboundedSender<ReliableEvent>,
    clients: Arc<Mutex<HashMap<u64, ClientHandle>>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match read_half.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                warn!(client_id, error = %e, "read error");
                break;
            }
        }

        loop {
            match try_parse_frame(&buf) {
                Ok(Some((header, payload, consumed))) => {
                    let payload = payload.to_vec();
                    let event = ReliableEvent::Frame {
                        client_id,
                        msg_type: header.msg_type,
                        payload,
                    };
                    buf.drain(..consumed);
                    if event_tx.send(event).is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(client_id, error = %e, "malformed frame, dropping connection");
                    clients.lock().await.remove(&client_id);
                    let _ = event_tx.send(ReliableEvent::Disconnected { client_id });
                    return;
                }
            }
        }
    }

    clients.lock().await.remove(&client_id);
    debug!(client_id, "client disconnected");
    let _ = event_tx.send(ReliableEvent::Disconnected { client_id });
}

async fn writer_loop(
    client_id: u64,
    mut write_half: tokio::net::tcp::OwnedWriteHalf,
    mut write_rx: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    while let Some(bytes) = write_rx.recv().await {
        if let Err(e) = write_half.write_all(&bytes).await {
            warn!(client_id, error = %e, "write failed");
            break;
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
    use crate::protocol::frame::encode_frame;

    #[tokio::test]
    async fn accepts_connection_and_receives_frame() {
        let (transport, mut rx) = ReliableTransport::bind(0).await.unwrap();
        let addr = format!("127.0.0.1:{}", transport.local_port());

        let mut client = TcpStream::connect(&addr).await.unwrap();
        let frame = encode_frame(0x01, b"hi");
        client.write_all(&frame).await.unwrap();

        let connected = rx.recv().await.unwrap();
        let client_id = match connected {
            ReliableEvent::Connected { client_id, .. } => client_id,
            other => panic!("expected Connected, got {other:?}"),
        };

        let event = rx.recv().await.unwrap();
        match event {
            ReliableEvent::Frame {
                client_id: id,
                msg_type,
                payload,
            } => {
                assert_eq!(id, client_id);
                assert_eq!(msg_type, 0x01);
                assert_eq!(payload, b"hi");
            }
            other => panic!("expected Frame, got {other:?}"),
        }

        drop(client);
        transport.shutdown();
    }

    #[tokio::test]
    async fn send_to_client_reaches_the_socket() {
        let (transport, mut rx) = ReliableTransport::bind(0).await.unwrap();
        let addr = format!("127.0.0.1:{}", transport.local_port());

        let mut client = TcpStream::connect(&addr).await.unwrap();
        let client_id = match rx.recv().await.unwrap() {
            ReliableEvent::Connected { client_id, .. } => client_id,
            other => panic!("expected Connected, got {other:?}"),
        };

        let frame = encode_frame(0x02, b"world");
        assert!(transport.send_to_client(client_id, frame.clone()).await);

        let mut buf = vec![0u8; frame.len()];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, frame);

        transport.shutdown();
    }

    #[tokio::test]
    async fn send_to_unknown_client_returns_false() {
        let (transport, _rx) = ReliableTransport::bind(0).await.unwrap();
        assert!(!transport.send_to_client(9999, vec![0u8]).await);
        transport.shutdown();
    }

    #[test]
    fn encode_frame_is_compatible_with_try_parse_frame() {
        let encoded = encode_frame(0x01, b"abc");
        let parsed = try_parse_frame(&encoded).unwrap().unwrap();
        assert_eq!(parsed.0.msg_type, 0x01);
        assert_eq!(parsed.1, b"abc");
    }
}
