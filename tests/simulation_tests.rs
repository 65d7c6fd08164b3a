#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! End-to-end simulation scenarios: a real UDP client talking to a
//! [`SessionBridge`]-spawned simulation over the datagram transport.

use std::time::Duration;

use tokio::net::UdpSocket;

use voidrunner_server::bridge::SessionBridge;
use voidrunner_server::config::GameplaySection;
use voidrunner_server::protocol::datagram::{input_bit, ClientDatagram, ServerDatagram};
use voidrunner_server::protocol::frame::parse_datagram;
use voidrunner_server::shutdown::Shutdown;

const TICK_DT: f32 = 1.0 / 30.0;

async fn start_bridge(seats: &[u8]) -> (Shutdown, u16) {
    let (shutdown, watch) = Shutdown::new();
    let bridge = SessionBridge::new(GameplaySection::default(), TICK_DT, watch);
    let info = bridge.start_room(seats).await.expect("start simulation");
    (shutdown, info.udp_port)
}

async fn recv_datagram(socket: &UdpSocket) -> ServerDatagram {
    let mut buf = [0u8; 1200];
    let (len, _from) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .expect("timed out waiting for a datagram")
        .expect("recv_from");
    let (header, _seq, payload) = parse_datagram(&buf[..len]).expect("parse datagram");
    ServerDatagram::decode(header.msg_type, payload).expect("decode server datagram")
}

#[tokio::test]
async fn client_ping_binds_seat_and_returns_assignment_then_create_burst() {
    let (shutdown, port) = start_bridge(&[1]).await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.connect(("127.0.0.1", port)).await.unwrap();

    let ping = ClientDatagram::ClientPing { timestamp: 0, seat: 1 }.encode(0);
    client.send(&ping).await.unwrap();

    let first = recv_datagram(&client).await;
    assert!(matches!(first, ServerDatagram::PlayerAssignment { .. }));

    let second = recv_datagram(&client).await;
    assert!(matches!(second, ServerDatagram::EntityCreate { .. }));

    shutdown.trigger();
}

#[tokio::test]
async fn player_input_moves_the_player_right_by_one_step() {
    let (shutdown, port) = start_bridge(&[1]).await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.connect(("127.0.0.1", port)).await.unwrap();

    let ping = ClientDatagram::ClientPing { timestamp: 0, seat: 1 }.encode(0);
    client.send(&ping).await.unwrap();
    let assignment = recv_datagram(&client).await;
    let net_id = match assignment {
        ServerDatagram::PlayerAssignment { net_id } => net_id,
        other => panic!("expected PlayerAssignment, got {other:?}"),
    };
    let create = recv_datagram(&client).await;
    let before_x = match create {
        ServerDatagram::EntityCreate { net_id: id, pos_x, .. } if id == net_id => pos_x,
        other => panic!("expected this seat's EntityCreate, got {other:?}"),
    };

    let input = ClientDatagram::PlayerInput {
        direction: input_bit::RIGHT,
    }
    .encode(1);
    client.send(&input).await.unwrap();

    // Wait for the next ENTITY_UPDATE broadcast and find this player's entry.
    loop {
        match recv_datagram(&client).await {
            ServerDatagram::EntityUpdate { entities } => {
                if let Some(state) = entities.iter().find(|e| e.net_id == net_id) {
                    assert!((state.pos_x - (before_x + 0.005)).abs() < 1e-6);
                    break;
                }
            }
            ServerDatagram::GameState { .. } => continue,
            _ => continue,
        }
    }

    shutdown.trigger();
}

#[tokio::test]
async fn two_seats_both_receive_broadcasts() {
    let (shutdown, port) = start_bridge(&[1, 2]).await;
    let client1 = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client1.connect(("127.0.0.1", port)).await.unwrap();
    let client2 = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client2.connect(("127.0.0.1", port)).await.unwrap();

    client1
        .send(&ClientDatagram::ClientPing { timestamp: 0, seat: 1 }.encode(0))
        .await
        .unwrap();
    client2
        .send(&ClientDatagram::ClientPing { timestamp: 0, seat: 2 }.encode(0))
        .await
        .unwrap();

    // Each seat gets its own assignment plus a create burst with both players.
    assert!(matches!(recv_datagram(&client1).await, ServerDatagram::PlayerAssignment { .. }));
    assert!(matches!(recv_datagram(&client1).await, ServerDatagram::EntityCreate { .. }));
    assert!(matches!(recv_datagram(&client2).await, ServerDatagram::PlayerAssignment { .. }));
    assert!(matches!(recv_datagram(&client2).await, ServerDatagram::EntityCreate { .. }));

    shutdown.trigger();
}
