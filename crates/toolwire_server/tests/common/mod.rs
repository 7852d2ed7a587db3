//! Common test utilities: a running server on an ephemeral port and a raw
//! line-framed peer for speaking the protocol directly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{Value as JsonValue, json};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use toolwire_core::transport::{self, Frame, FramedStream};
use toolwire_core::{Envelope, MessageType};
use toolwire_server::{ServerConfig, ToolServer};
use toolwire_toolbus::{Tool, ToolResult};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_config() -> ServerConfig {
    ServerConfig::new().with_port(0)
}

/// Starts a server and returns it with its bound address.
pub async fn start_server(config: ServerConfig) -> (ToolServer, SocketAddr) {
    start_server_with(ToolServer::new(config)).await
}

pub async fn start_server_with(mut server: ToolServer) -> (ToolServer, SocketAddr) {
    let addr = server.start().await.expect("server should start");
    (server, addr)
}

pub struct Peer {
    framed: FramedStream,
}

impl Peer {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        Self {
            framed: transport::framed(stream),
        }
    }

    pub async fn send(&mut self, envelope: &Envelope) {
        self.send_raw(&envelope.to_frame().unwrap()).await;
    }

    pub async fn send_raw(&mut self, frame: &str) {
        self.framed.send(frame.to_string()).await.expect("send");
    }

    /// Writes bytes straight to the socket, bypassing line encoding.
    #[allow(dead_code)]
    pub async fn send_bytes(&mut self, bytes: &[u8]) {
        let stream = self.framed.get_mut();
        stream.write_all(bytes).await.expect("write");
        stream.flush().await.expect("flush");
    }

    /// Shuts down the write half; replies can still be read.
    #[allow(dead_code)]
    pub async fn close_write(&mut self) {
        self.framed.get_mut().shutdown().await.expect("shutdown");
    }

    /// Next envelope, or `None` once the server closes the stream.
    pub async fn recv(&mut self) -> Option<Envelope> {
        let next = tokio::time::timeout(RECV_TIMEOUT, self.framed.next())
            .await
            .expect("timed out waiting for a frame");
        match next {
            Some(Ok(Frame::Line(line))) => Some(toolwire_core::parse(&line).expect("server sent a valid envelope")),
            _ => None,
        }
    }

    pub async fn request(&mut self, envelope: &Envelope) -> Envelope {
        self.send(envelope).await;
        self.recv().await.expect("connection closed before reply")
    }

    /// Round trip that proves the server has admitted this peer.
    pub async fn ping(&mut self) {
        let reply = self.request(&Envelope::ping()).await;
        assert_eq!(reply.message_type, MessageType::Pong);
    }
}

/// Returns `Err` from its body.
pub struct FailingTool;

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

/// Panics inside its body.
pub struct PanickingTool;

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

#[allow(dead_code)]
pub fn faulty_server(config: ServerConfig) -> ToolServer {
    ToolServer::new(config)
        .with_tool(Arc::new(FailingTool))
        .with_tool(Arc::new(PanickingTool))
}
