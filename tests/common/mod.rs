#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test harness for Voidrunner server integration tests.
//!
//! Spins up the real reliable-channel transport and dispatcher on an
//! ephemeral port and gives tests a thin client to script HELLO/room
//! traffic and read back framed responses.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use voidrunner_server::bridge::SessionBridge;
use voidrunner_server::config::GameplaySection;
use voidrunner_server::dispatcher::Dispatcher;
use voidrunner_server::protocol::frame::try_parse_frame;
use voidrunner_server::protocol::messages::{ClientMessage, ServerMessage};
use voidrunner_server::shutdown::Shutdown;
use voidrunner_server::transport::reliable::ReliableTransport;

/// Server id/ip announced in `GAME_START`, fixed for test determinism.
pub const TEST_SERVER_ID: u16 = 1;
pub const TEST_SERVER_IP: u32 = 0x7f00_0001;

/// A running server instance bound to an OS-chosen port, torn down on drop.
pub struct TestServer {
    pub addr: String,
    shutdown: Shutdown,
}

impl TestServer {
    pub async fn start() -> Self {
        let (transport, events) = ReliableTransport::bind(0)
            .await
            .expect("bind reliable transport");
        let port = transport.local_port();
        let transport = Arc::new(transport);

        let (shutdown, watch) = Shutdown::new();
        let bridge = SessionBridge::new(GameplaySection::default(), 1.0 / 30.0, watch.clone());
        let dispatcher = Dispatcher::new(transport, bridge, TEST_SERVER_ID, TEST_SERVER_IP);
        tokio::spawn(dispatcher.run(events, watch));

        Self {
            addr: format!("127.0.0.1:{port}"),
            shutdown,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Connect a fresh reliable-channel client to the running test server.
pub async fn connect(server: &TestServer) -> TcpStream {
    TcpStream::connect(&server.addr)
        .await
        .unwrap_or_else(|e| panic!("connect to {}: {e}", server.addr))
}

/// Encode and send one client message.
pub async fn send(stream: &mut TcpStream, message: ClientMessage) {
    let bytes = message.encode().expect("encode client message");
    stream.write_all(&bytes).await.expect("write client message");
}

/// Read exactly one framed server message, accumulating bytes as needed.
pub async fn recv(stream: &mut TcpStream) -> ServerMessage {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        if let Ok(Some((header, payload, consumed))) = try_parse_frame(&buf) {
            let message = ServerMessage::decode(header.msg_type, payload).expect("decode server message");
            buf.drain(..consumed);
            return message;
        }
        let n = stream.read(&mut chunk).await.expect("read server message");
        assert!(n > 0, "connection closed while awaiting a frame");
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Drive `HELLO` and return once `HELLO_ACK`/`HELLO_NAK` arrives.
pub async fn hello(stream: &mut TcpStream, name: &str) -> ServerMessage {
    send(stream, ClientMessage::Hello { name: name.into() }).await;
    recv(stream).await
}
