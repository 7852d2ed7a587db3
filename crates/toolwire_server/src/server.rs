use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use toolwire_observability::connection_span;
use toolwire_toolbus::{Tool, ToolRegistry, builtin_tool};
use tracing::{Instrument, debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::{ConnectionId, ConnectionTracker, reject, serve_connection};
use crate::dispatch::Dispatcher;
use crate::error::{Result, ServerError};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Started { addr: SocketAddr },
    Stopped,
    ConnectionOpened { id: ConnectionId, peer: SocketAddr },
    ConnectionRejected { peer: SocketAddr },
    ConnectionClosed { id: ConnectionId },
}

struct Running {
    addr: SocketAddr,
    shutdown: CancellationToken,
    tracker: Arc<ConnectionTracker>,
    accept: JoinHandle<()>,
}

/// Accepts connections and serves tool calls from its registry.
///
/// Each `start()` builds a fresh registry from the configured tool names
/// plus any tools added with [`ToolServer::with_tool`]. `stop()` leaves the
/// registry in place so its stats can still be inspected.
pub struct ToolServer {
    config: ServerConfig,
    extra_tools: Vec<Arc<dyn Tool>>,
    registry: Arc<ToolRegistry>,
    events: broadcast::Sender<ServerEvent>,
    running: Option<Running>,
}

impl ToolServer {
    pub fn new(config: ServerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            extra_tools: Vec::new(),
            registry: Arc::new(ToolRegistry::new()),
            events,
            running: None,
        }
    }

    /// Adds a tool registered on every start, after the configured built-ins.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.extra_tools.push(tool);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.running.as_ref().map_or(0, |r| r.tracker.len())
    }

    fn build_registry(&self) -> Result<ToolRegistry> {
        let registry = ToolRegistry::new();
        for name in &self.config.tools {
            let tool = builtin_tool(name)
                .ok_or_else(|| ServerError::Initialization(format!("Unknown tool '{name}'")))?;
            registry.register_arc(tool);
        }
        for tool in &self.extra_tools {
            registry.register_arc(Arc::clone(tool));
        }
        Ok(registry)
    }

    /// Registers the configured tools, binds and starts accepting.
    ///
    /// Returns the bound address. Calling it while running returns the
    /// current address without rebinding.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(running) = &self.running {
            debug!(addr = %running.addr, "Server already running");
            return Ok(running.addr);
        }

        self.config.validate()?;
        let registry = Arc::new(self.build_registry()?);

        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr: bind_addr, source })?;

        self.registry = Arc::clone(&registry);
        let shutdown = CancellationToken::new();
        let tracker = Arc::new(ConnectionTracker::new(
            self.config.max_connections,
            shutdown.clone(),
        ));

        let accept = tokio::spawn(accept_loop(
            listener,
            Arc::new(Dispatcher::new(registry)),
            Arc::clone(&tracker),
            shutdown.clone(),
            self.events.clone(),
        ));

        self.running = Some(Running {
            addr,
            shutdown,
            tracker,
            accept,
        });

        info!(
            addr = %addr,
            max_connections = self.config.max_connections,
            tools = self.registry.len(),
            "Server started"
        );
        let _ = self.events.send(ServerEvent::Started { addr });
        Ok(addr)
    }

    /// Closes every connection and the listener. No-op when stopped.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.shutdown.cancel();
        let closed = running.tracker.close_all();
        if let Err(e) = running.accept.await {
            warn!(error = %e, "Accept loop ended abnormally");
        }

        info!(addr = %running.addr, closed_connections = closed, "Server stopped");
        let _ = self.events.send(ServerEvent::Stopped);
    }
}

impl Drop for ToolServer {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.shutdown.cancel();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    tracker: Arc<ConnectionTracker>,
    shutdown: CancellationToken,
    events: broadcast::Sender<ServerEvent>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        continue;
                    }
                };

                let Some((id, token)) = tracker.try_admit() else {
                    warn!(peer = %peer, "Rejecting connection, server busy");
                    let _ = events.send(ServerEvent::ConnectionRejected { peer });
                    connections.spawn(reject(stream, peer));
                    continue;
                };

                let _ = stream.set_nodelay(true);
                let _ = events.send(ServerEvent::ConnectionOpened { id, peer });

                let dispatcher = Arc::clone(&dispatcher);
                let tracker = Arc::clone(&tracker);
                let events = events.clone();
                connections.spawn(
                    async move {
                        info!("Connection opened");
                        serve_connection(stream, dispatcher, token).await;
                        tracker.remove(id);
                        info!("Connection closed");
                        let _ = events.send(ServerEvent::ConnectionClosed { id });
                    }
                    .instrument(connection_span!(id, peer)),
                );
            }
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "Connection task failed");
                }
            }
        }
    }

    tracker.close_all();
    while connections.join_next().await.is_some() {}
    debug!("Accept loop finished");
}
