//! Common test utilities: an in-process server and client presets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tokio::sync::broadcast;
use toolwire_client::{ClientConfig, ClientEvent, ToolClient};
use toolwire_server::{ServerConfig, ToolServer};
use toolwire_toolbus::{Tool, ToolResult};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn start_server() -> (ToolServer, SocketAddr) {
    start_server_on(0).await
}

pub async fn start_server_on(port: u16) -> (ToolServer, SocketAddr) {
    let mut server = ToolServer::new(ServerConfig::new().with_port(port));
    let addr = server.start().await.expect("server should start");
    (server, addr)
}

/// A server that also exposes `fail` (returns `Err`) and `panic`.
#[allow(dead_code)]
pub async fn start_faulty_server() -> (ToolServer, SocketAddr) {
    let mut server = ToolServer::new(ServerConfig::new().with_port(0))
        .with_tool(Arc::new(FailingTool))
        .with_tool(Arc::new(PanickingTool));
    let addr = server.start().await.expect("server should start");
    (server, addr)
}

struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "fail"
    }

    fn description(&self) -> &str {
        "Always errors"
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, _params: JsonValue) -> ToolResult {
        Err(anyhow::anyhow!("deliberate failure"))
    }
}

struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "panic"
    }

    fn description(&self) -> &str {
        "Always panics"
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, _params: JsonValue) -> ToolResult {
        panic!("tool blew up")
    }
}

pub fn url(addr: SocketAddr) -> String {
    format!("tcp://{addr}")
}

/// Short timers so reconnect paths finish quickly.
pub fn fast_config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::new(url(addr))
        .with_timeout(Duration::from_secs(2))
        .with_reconnect_delay(Duration::from_millis(50))
        .with_max_reconnect_attempts(3)
}

pub async fn connected_client(addr: SocketAddr) -> ToolClient {
    let client = ToolClient::new(fast_config(addr));
    client.connect().await.expect("connect");
    assert!(client.is_connected());
    client
}

/// An address with nothing listening on it.
#[allow(dead_code)]
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Waits for the first event matching `pred`, returning everything seen
/// up to and including it.
#[allow(dead_code)]
pub async fn wait_for(
    events: &mut broadcast::Receiver<ClientEvent>,
    pred: impl Fn(&ClientEvent) -> bool,
) -> Vec<ClientEvent> {
    let mut seen = Vec::new();
    let found = tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            let done = pred(&event);
            seen.push(event);
            if done {
                break;
            }
        }
    })
    .await;
    assert!(found.is_ok(), "timed out waiting for event, saw {seen:?}");
    seen
}
