use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use winccua_ws_client::{Client, Error};

mod harness;

#[tokio::test]
async fn connect_succeeds_when_first_frame_is_ack() {
    let (connection, server) = harness::fake_connection();

    let (_, build_result) = tokio::join!(server.ack_handshake(), Client::builder().build(connection));

    assert_matches!(build_result, Ok(_));
}

#[tokio::test]
async fn connect_sends_token_in_init_payload() {
    let (connection, server) = harness::fake_connection();

    let build = Client::builder().bearer_token("abc123").build(connection);

    let ((), build_result) = tokio::join!(
        async {
            let init = server.next_frame().await;
            assert_eq!(init["type"], "connection_init");
            assert_eq!(init["payload"]["Authorization"], "Bearer abc123");
            server.send_json(json!({"type": "connection_ack"})).await;
        },
        build
    );

    assert_matches!(build_result, Ok(_));
}

#[tokio::test]
async fn connect_fails_when_first_frame_is_not_ack() {
    let (connection, server) = harness::fake_connection();

    let ((), build_result) = tokio::join!(
        async {
            let init = server.next_frame().await;
            assert_eq!(init["type"], "connection_init");
            server
                .send_json(json!({"type": "next", "id": "1", "payload": {}}))
                .await;
        },
        Client::builder().build(connection)
    );

    assert_matches!(build_result, Err(Error::Handshake(_)));
}

#[tokio::test]
async fn connect_tolerates_pings_while_waiting_for_ack() {
    let (connection, server) = harness::fake_connection();

    let ((), build_result) = tokio::join!(
        async {
            let init = server.next_frame().await;
            assert_eq!(init["type"], "connection_init");
            server.send_json(json!({"type": "ping"})).await;
            let pong = server.next_frame().await;
            assert_eq!(pong["type"], "pong");
            server.send_json(json!({"type": "connection_ack"})).await;
        },
        Client::builder().build(connection)
    );

    assert_matches!(build_result, Ok(_));
}

#[tokio::test]
async fn connect_times_out_without_ack() {
    let (connection, _server) = harness::fake_connection();

    let build_result = Client::builder()
        .handshake_timeout(Duration::from_millis(50))
        .build(connection)
        .await;

    assert_matches!(build_result, Err(Error::Handshake(_)));
}

#[tokio::test]
async fn connect_fails_when_transport_drops_before_ack() {
    let (connection, server) = harness::fake_connection();
    server.disconnect();

    let build_result = Client::builder().build(connection).await;

    assert_matches!(build_result, Err(Error::Transport(_)));
}
