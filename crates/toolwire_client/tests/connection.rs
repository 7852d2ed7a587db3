//! Connection lifecycle: connect, disconnect, loss, reconnect and heartbeat.

mod common;

use std::time::Duration;

use common::{closed_addr, connected_client, fast_config, start_server, start_server_on, url, wait_for};
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use serde_json::json;
use toolwire_client::{ClientConfig, ClientError, ClientEvent, ConnectionState, ToolClient};
use toolwire_core::transport::{self, MAX_FRAME_BYTES};
use toolwire_core::{Envelope, MessageType};

#[tokio::test]
async fn test_connect_emits_connected_once() {
    let (_server, addr) = start_server().await;
    let client = ToolClient::new(fast_config(addr));
    let mut events = client.subscribe();

    assert_eq!(client.state(), ConnectionState::Disconnected);
    client.connect().await.unwrap();
    client.connect().await.unwrap();

    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(events.recv().await.unwrap(), ClientEvent::Connected);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (server, addr) = start_server().await;
    let client = connected_client(addr).await;
    let mut events = client.subscribe();

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.reconnect_attempts(), 0);
    assert_eq!(events.recv().await.unwrap(), ClientEvent::Disconnected);

    client.disconnect();
    assert!(events.try_recv().is_err());

    let err = client.call_tool("echo", json!({"v": 1})).await.unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));

    // The server sees an orderly close and frees the slot.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.connection_count(), 0);
}

#[tokio::test]
async fn test_disconnect_fails_in_flight_calls() {
    let (_server, addr) = start_server().await;
    let client = connected_client(addr).await;

    let call = client.call_tool("delay", json!({"ms": 2000}));
    let disconnect = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.disconnect();
    };
    let (result, ()) = tokio::join!(call, disconnect);

    assert!(matches!(result.unwrap_err(), ClientError::ConnectionLost));
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn test_reconnect_attempts_are_bounded() {
    let addr = closed_addr().await;
    let client = ToolClient::new(fast_config(addr).with_max_reconnect_attempts(2));
    let mut events = client.subscribe();

    // Attempts remain, so the first failure is not raised.
    client.connect().await.unwrap();

    let seen = wait_for(&mut events, |e| matches!(e, ClientEvent::ConnectionFailed { .. })).await;
    assert_eq!(
        &seen[..2],
        &[
            ClientEvent::Reconnecting { attempt: 1 },
            ClientEvent::Reconnecting { attempt: 2 },
        ]
    );
    assert_eq!(seen.len(), 3);
    assert_eq!(client.reconnect_attempts(), 2);
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // Nothing further is scheduled.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_connect_without_retries_raises() {
    let addr = closed_addr().await;
    let client = ToolClient::new(fast_config(addr).with_max_reconnect_attempts(0));
    let mut events = client.subscribe();

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionFailed(_)));
    assert_eq!(err.code(), "CONNECTION_FAILED");
    assert!(matches!(events.recv().await.unwrap(), ClientEvent::ConnectionFailed { .. }));
}

#[tokio::test]
async fn test_invalid_url_is_rejected_before_dialing() {
    let client = ToolClient::new(ClientConfig::new("http://127.0.0.1:1"));
    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_disconnect_cancels_scheduled_reconnect() {
    let addr = closed_addr().await;
    let client = ToolClient::new(
        fast_config(addr)
            .with_reconnect_delay(Duration::from_millis(200))
            .with_max_reconnect_attempts(5),
    );
    let mut events = client.subscribe();

    client.connect().await.unwrap();
    assert_eq!(events.recv().await.unwrap(), ClientEvent::Reconnecting { attempt: 1 });

    client.disconnect();
    assert_eq!(events.recv().await.unwrap(), ClientEvent::Disconnected);
    assert_eq!(client.reconnect_attempts(), 0);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_connection_loss_fails_pending_and_reconnects() {
    let (mut server, addr) = start_server().await;
    let client = ToolClient::new(
        fast_config(addr)
            .with_reconnect_delay(Duration::from_millis(100))
            .with_max_reconnect_attempts(10),
    );
    client.connect().await.unwrap();
    let mut events = client.subscribe();

    let call = client.call_tool("delay", json!({"ms": 2000}));
    let stop = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        server.stop().await;
    };
    let (result, ()) = tokio::join!(call, stop);
    assert!(matches!(result.unwrap_err(), ClientError::ConnectionLost));

    let seen = wait_for(&mut events, |e| matches!(e, ClientEvent::Reconnecting { .. })).await;
    assert_eq!(seen[0], ClientEvent::ConnectionLost);
    assert!(client.reconnect_attempts() >= 1);

    // Bring a server back on the same port; the client finds it and the
    // attempt counter resets.
    let (_server, _) = start_server_on(addr.port()).await;
    wait_for(&mut events, |e| *e == ClientEvent::Connected).await;
    assert_eq!(client.reconnect_attempts(), 0);
    assert!(client.is_connected());

    let outcome = client.call_tool("echo", json!({"v": "back"})).await.unwrap();
    assert_eq!(outcome.data, Some(json!("back")));
}

#[tokio::test]
async fn test_heartbeat_sends_pings() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let client = ToolClient::new(
        ClientConfig::new(url(addr)).with_heartbeat_interval(Duration::from_millis(50)),
    );
    let (accepted, connected) = tokio::join!(listener.accept(), client.connect());
    connected.unwrap();
    let (stream, _) = accepted.unwrap();
    let mut framed = transport::framed(stream);

    for _ in 0..2 {
        let line = tokio::time::timeout(Duration::from_secs(2), framed.next())
            .await
            .expect("heartbeat within deadline")
            .unwrap()
            .unwrap()
            .into_line()
            .unwrap();
        let envelope = toolwire_core::parse(&line).unwrap();
        assert_eq!(envelope.message_type, MessageType::Ping);
    }
}

#[tokio::test]
async fn test_unreadable_server_frames_keep_connection() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let client = ToolClient::new(ClientConfig::new(url(addr)));
    let (accepted, connected) = tokio::join!(listener.accept(), client.connect());
    connected.unwrap();
    let (mut stream, _) = accepted.unwrap();

    let mut junk = b"\xff\xfe\n".to_vec();
    junk.extend(vec![b'x'; MAX_FRAME_BYTES + 1]);
    junk.push(b'\n');

    let server_side = async move {
        stream.write_all(&junk).await.unwrap();
        let mut framed = transport::framed(stream);
        let line = framed.next().await.unwrap().unwrap().into_line().unwrap();
        let request = toolwire_core::parse(&line).unwrap();
        assert_eq!(request.message_type, MessageType::Ping);
        framed.send(Envelope::pong(&request).to_frame().unwrap()).await.unwrap();
        framed
    };
    let (rtt, _framed) = tokio::join!(client.ping(), server_side);

    rtt.unwrap();
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_dropping_client_closes_connection() {
    let (server, addr) = start_server().await;
    let client = connected_client(addr).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.connection_count(), 1);

    drop(client);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.connection_count(), 0);
}
