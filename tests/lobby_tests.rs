#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! End-to-end lobby/matchmaking scenarios against a real reliable-channel
//! transport and dispatcher.

mod common;

use voidrunner_server::error_codes::ErrorCode;
use voidrunner_server::protocol::messages::{ClientMessage, ServerMessage};

use common::{connect, hello, recv, send, TestServer, TEST_SERVER_ID, TEST_SERVER_IP};

#[tokio::test]
async fn two_players_fill_a_room_and_receive_game_start() {
    let server = TestServer::start().await;

    let mut a = connect(&server).await;
    let mut b = connect(&server).await;

    assert!(matches!(hello(&mut a, "A").await, ServerMessage::HelloAck { .. }));
    assert!(matches!(hello(&mut b, "B").await, ServerMessage::HelloAck { .. }));

    send(
        &mut a,
        ClientMessage::CreateRoom {
            capacity: 2,
            name: "r1".into(),
        },
    )
    .await;
    let room_id = match recv(&mut a).await {
        ServerMessage::CreateAck { room_id } => room_id,
        other => panic!("expected CreateAck, got {other:?}"),
    };
    assert_eq!(room_id, 1);

    send(&mut b, ClientMessage::JoinRoom { room_id }).await;
    match recv(&mut b).await {
        ServerMessage::JoinAck { room_id: r, your_seat, .. } => {
            assert_eq!(r, room_id);
            assert_eq!(your_seat, 2);
        }
        other => panic!("expected JoinAck, got {other:?}"),
    }
    // A is notified of B joining.
    assert!(matches!(recv(&mut a).await, ServerMessage::MemberJoined(_)));

    send(&mut a, ClientMessage::Ready { ready: true }).await;
    send(&mut b, ClientMessage::Ready { ready: true }).await;

    let start_a = recv(&mut a).await;
    let start_b = recv(&mut b).await;
    match (start_a, start_b) {
        (
            ServerMessage::GameStart {
                udp_port: port_a,
                server_id: id_a,
                server_ip: ip_a,
            },
            ServerMessage::GameStart {
                udp_port: port_b,
                server_id: id_b,
                server_ip: ip_b,
            },
        ) => {
            assert_eq!(port_a, port_b);
            assert_ne!(port_a, 0);
            assert_eq!(id_a, TEST_SERVER_ID);
            assert_eq!(id_b, TEST_SERVER_ID);
            assert_eq!(ip_a, TEST_SERVER_IP);
            assert_eq!(ip_b, TEST_SERVER_IP);
        }
        other => panic!("expected both clients to receive GameStart, got {other:?}"),
    }
}

#[tokio::test]
async fn ready_before_joining_a_room_is_rejected() {
    let server = TestServer::start().await;
    let mut c = connect(&server).await;
    assert!(matches!(hello(&mut c, "C").await, ServerMessage::HelloAck { .. }));

    send(&mut c, ClientMessage::Ready { ready: true }).await;
    match recv(&mut c).await {
        ServerMessage::ProtocolError { error } => assert_eq!(error, ErrorCode::UnexpectedMessage),
        other => panic!("expected ProtocolError(UnexpectedMessage), got {other:?}"),
    }
}

#[tokio::test]
async fn third_client_to_a_full_room_gets_room_full() {
    let server = TestServer::start().await;

    let mut a = connect(&server).await;
    let mut b = connect(&server).await;
    let mut c = connect(&server).await;

    assert!(matches!(hello(&mut a, "A").await, ServerMessage::HelloAck { .. }));
    assert!(matches!(hello(&mut b, "B").await, ServerMessage::HelloAck { .. }));
    assert!(matches!(hello(&mut c, "C").await, ServerMessage::HelloAck { .. }));

    send(
        &mut a,
        ClientMessage::CreateRoom {
            capacity: 2,
            name: "derelict-run".into(),
        },
    )
    .await;
    let room_id = match recv(&mut a).await {
        ServerMessage::CreateAck { room_id } => room_id,
        other => panic!("expected CreateAck, got {other:?}"),
    };

    send(&mut b, ClientMessage::JoinRoom { room_id }).await;
    assert!(matches!(recv(&mut b).await, ServerMessage::JoinAck { .. }));
    assert!(matches!(recv(&mut a).await, ServerMessage::MemberJoined(_)));

    send(&mut c, ClientMessage::JoinRoom { room_id }).await;
    match recv(&mut c).await {
        ServerMessage::JoinNak { error } => assert_eq!(error, ErrorCode::RoomFull),
        other => panic!("expected JoinNak(RoomFull), got {other:?}"),
    }
}

#[tokio::test]
async fn leaving_a_room_notifies_remaining_members() {
    let server = TestServer::start().await;

    let mut a = connect(&server).await;
    let mut b = connect(&server).await;
    assert!(matches!(hello(&mut a, "A").await, ServerMessage::HelloAck { .. }));
    assert!(matches!(hello(&mut b, "B").await, ServerMessage::HelloAck { .. }));

    send(
        &mut a,
        ClientMessage::CreateRoom {
            capacity: 2,
            name: "r1".into(),
        },
    )
    .await;
    let room_id = match recv(&mut a).await {
        ServerMessage::CreateAck { room_id } => room_id,
        other => panic!("expected CreateAck, got {other:?}"),
    };
    send(&mut b, ClientMessage::JoinRoom { room_id }).await;
    assert!(matches!(recv(&mut b).await, ServerMessage::JoinAck { .. }));
    assert!(matches!(recv(&mut a).await, ServerMessage::MemberJoined(_)));

    send(&mut b, ClientMessage::LeaveRoom).await;
    assert!(matches!(recv(&mut b).await, ServerMessage::LeaveAck));
    match recv(&mut a).await {
        ServerMessage::MemberLeft { seat } => assert_eq!(seat, 2),
        other => panic!("expected MemberLeft, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_removes_client_from_its_room() {
    let server = TestServer::start().await;

    let mut a = connect(&server).await;
    let b = connect(&server).await;
    assert!(matches!(hello(&mut a, "A").await, ServerMessage::HelloAck { .. }));

    send(
        &mut a,
        ClientMessage::CreateRoom {
            capacity: 2,
            name: "r1".into(),
        },
    )
    .await;
    let room_id = match recv(&mut a).await {
        ServerMessage::CreateAck { room_id } => room_id,
        other => panic!("expected CreateAck, got {other:?}"),
    };

    // `b` never sends HELLO; dropping its socket should not disturb `a`'s room.
    drop(b);

    send(&mut a, ClientMessage::RoomInfo { room_id }).await;
    match recv(&mut a).await {
        ServerMessage::RoomInfoResp(info) => assert_eq!(info.count, 1),
        other => panic!("expected RoomInfoResp, got {other:?}"),
    }
}
