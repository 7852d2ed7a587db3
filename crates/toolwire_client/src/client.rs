use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use toolwire_core::transport::{self, Frame, FramedStream};
use toolwire_core::{
    Envelope, ErrorPayload, MessageType, ToolInfo, ToolOutcome, ToolResultPayload,
    ToolsListPayload, UNKNOWN_ID, codec,
};
use toolwire_observability::{client_request_span, record_duration, record_error};
use tracing::{Instrument, debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::pending::PendingRequests;

const EVENT_CAPACITY: usize = 64;
const OUTBOUND_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected,
    Disconnected,
    ConnectionLost,
    Reconnecting { attempt: u32 },
    ConnectionFailed { reason: String },
}

struct Session {
    generation: u64,
    outbound: mpsc::Sender<String>,
    cancel: CancellationToken,
}

struct Shared {
    state: ConnectionState,
    /// Bumped whenever a session starts or ends, so stale tasks and
    /// superseded dials can tell they no longer own the connection.
    generation: u64,
    session: Option<Session>,
    reconnect_timer: Option<CancellationToken>,
}

struct ClientInner {
    config: ClientConfig,
    shared: Mutex<Shared>,
    pending: PendingRequests,
    reconnect_attempts: AtomicU32,
    tools: Mutex<HashMap<String, ToolInfo>>,
    events: broadcast::Sender<ClientEvent>,
    /// Parent of every background task's token.
    root: CancellationToken,
}

/// One logical connection to a toolwire server.
///
/// Requests are multiplexed over a single stream and matched to replies by
/// envelope id, so calls may be issued concurrently from clones of an
/// `Arc<ToolClient>`. Dropping the client stops its background tasks.
pub struct ToolClient {
    inner: Arc<ClientInner>,
}

impl ToolClient {
    pub fn new(config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ClientInner {
                config,
                shared: Mutex::new(Shared {
                    state: ConnectionState::Disconnected,
                    generation: 0,
                    session: None,
                    reconnect_timer: None,
                }),
                pending: PendingRequests::default(),
                reconnect_attempts: AtomicU32::new(0),
                tools: Mutex::new(HashMap::new()),
                events,
                root: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.reconnect_attempts.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    /// Opens the connection.
    ///
    /// No-op while connected or connecting. A failed dial with attempts to
    /// spare schedules a retry and returns `Ok`; once attempts run out the
    /// error is returned and [`ClientEvent::ConnectionFailed`] is emitted.
    pub async fn connect(&self) -> Result<()> {
        self.inner.connect().await
    }

    /// Closes the connection and cancels any scheduled reconnect.
    ///
    /// Outstanding requests fail with [`ClientError::ConnectionLost`].
    /// Calling it while already disconnected does nothing.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Lists the server's tools and refreshes the local cache.
    pub async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        let reply = self
            .inner
            .request(Envelope::list_tools(), MessageType::ToolsList)
            .await?;
        let payload: ToolsListPayload = reply.payload_as()?;

        let mut cache = self.inner.lock_tools();
        cache.clear();
        cache.extend(payload.tools.iter().map(|t| (t.name.clone(), t.clone())));
        Ok(payload.tools)
    }

    /// Cached entry from the last [`ToolClient::list_tools`].
    pub fn get_tool_info(&self, name: &str) -> Option<ToolInfo> {
        self.inner.lock_tools().get(name).cloned()
    }

    /// Invokes a tool.
    ///
    /// `Ok` covers both outcomes of a tool that ran, including
    /// `success: false`. `execution_time` is the round trip measured here.
    pub async fn call_tool(&self, name: &str, params: serde_json::Value) -> Result<ToolOutcome> {
        let start = Instant::now();
        let reply = self
            .inner
            .request(Envelope::tool_call(name, params), MessageType::ToolResult)
            .await?;
        let payload: ToolResultPayload = reply.payload_as()?;
        Ok(payload
            .result
            .with_execution_time(start.elapsed().as_millis() as u64))
    }

    /// Sends a `PING` and waits for its `PONG`, returning the round trip.
    pub async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();
        self.inner
            .request(Envelope::ping(), MessageType::Pong)
            .await?;
        Ok(start.elapsed())
    }
}

impl Drop for ToolClient {
    fn drop(&mut self) {
        self.inner.root.cancel();
        self.inner.pending.fail_all(|| ClientError::ConnectionLost);
    }
}

impl ClientInner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_tools(&self) -> MutexGuard<'_, HashMap<String, ToolInfo>> {
        self.tools.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    async fn connect(self: &Arc<Self>) -> Result<()> {
        let addr = self.config.socket_address()?;

        let generation = {
            let mut shared = self.lock();
            if shared.state != ConnectionState::Disconnected {
                debug!(state = ?shared.state, "Connect ignored");
                return Ok(());
            }
            shared.state = ConnectionState::Connecting;
            if let Some(timer) = shared.reconnect_timer.take() {
                timer.cancel();
            }
            shared.generation
        };

        debug!(addr = %addr, "Connecting");
        match self.dial(&addr).await {
            Ok(framed) => {
                self.establish(framed, generation);
                Ok(())
            }
            Err(e) => {
                let superseded = {
                    let mut shared = self.lock();
                    if shared.generation == generation {
                        shared.state = ConnectionState::Disconnected;
                        false
                    } else {
                        true
                    }
                };
                if superseded {
                    debug!(error = %e, "Dial failed after disconnect, not retrying");
                    return Ok(());
                }
                self.after_failed_dial(e)
            }
        }
    }

    async fn dial(&self, addr: &str) -> Result<FramedStream> {
        let stream = tokio::time::timeout(self.config.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::ConnectionFailed(format!("timed out connecting to {addr}")))?
            .map_err(|e| ClientError::ConnectionFailed(format!("{addr}: {e}")))?;
        let _ = stream.set_nodelay(true);
        Ok(transport::framed(stream))
    }

    fn after_failed_dial(self: &Arc<Self>, error: ClientError) -> Result<()> {
        let max = self.config.max_reconnect_attempts;
        let attempts = self.reconnect_attempts.load(Ordering::SeqCst);

        if attempts < max {
            let attempt = self.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            warn!(error = %error, attempt, max_attempts = max, "Connect failed, will retry");
            self.schedule_reconnect(attempt);
            Ok(())
        } else {
            let reason = error.to_string();
            warn!(error = %reason, attempts, "Connect failed, giving up");
            self.emit(ClientEvent::ConnectionFailed { reason });
            Err(error)
        }
    }

    /// Installs a live session unless a disconnect raced the dial.
    fn establish(self: &Arc<Self>, framed: FramedStream, dial_generation: u64) {
        let (sink, stream) = framed.split();
        let (outbound, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let cancel = self.root.child_token();

        let generation = {
            let mut shared = self.lock();
            if shared.generation != dial_generation || shared.state != ConnectionState::Connecting {
                debug!("Dial superseded, dropping new connection");
                return;
            }
            shared.generation += 1;
            shared.state = ConnectionState::Connected;
            shared.session = Some(Session {
                generation: shared.generation,
                outbound,
                cancel: cancel.clone(),
            });
            shared.generation
        };
        self.reconnect_attempts.store(0, Ordering::SeqCst);

        tokio::spawn(write_loop(Arc::clone(self), sink, rx, cancel.clone(), generation));
        tokio::spawn(read_loop(Arc::clone(self), stream, cancel.clone(), generation));
        tokio::spawn(heartbeat_loop(Arc::clone(self), cancel, generation));

        info!(server = %self.config.server_url, "Connected");
        self.emit(ClientEvent::Connected);
    }

    fn disconnect(&self) {
        let (session, timer, was_active) = {
            let mut shared = self.lock();
            let was_active = shared.state != ConnectionState::Disconnected
                || shared.session.is_some()
                || shared.reconnect_timer.is_some();
            shared.generation += 1;
            shared.state = ConnectionState::Disconnected;
            (shared.session.take(), shared.reconnect_timer.take(), was_active)
        };

        if let Some(timer) = timer {
            timer.cancel();
        }
        if let Some(session) = session {
            session.cancel.cancel();
        }
        self.reconnect_attempts.store(0, Ordering::SeqCst);

        if !was_active {
            return;
        }
        let failed = self.pending.fail_all(|| ClientError::ConnectionLost);
        info!(failed_requests = failed, "Disconnected");
        self.emit(ClientEvent::Disconnected);
    }

    /// Tears down the session owned by `generation` after a read/write
    /// failure, then retries or gives up. Stale generations are ignored.
    fn handle_connection_lost(self: &Arc<Self>, generation: u64) {
        let session = {
            let mut shared = self.lock();
            match &shared.session {
                Some(session) if session.generation == generation => {}
                _ => return,
            }
            shared.generation += 1;
            shared.state = ConnectionState::Disconnected;
            shared.session.take()
        };
        if let Some(session) = session {
            session.cancel.cancel();
        }

        let failed = self.pending.fail_all(|| ClientError::ConnectionLost);
        warn!(failed_requests = failed, "Connection lost");
        self.emit(ClientEvent::ConnectionLost);

        let max = self.config.max_reconnect_attempts;
        if self.reconnect_attempts.load(Ordering::SeqCst) < max {
            let attempt = self.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            self.schedule_reconnect(attempt);
        } else {
            warn!(max_attempts = max, "Not reconnecting, attempts exhausted");
            self.emit(ClientEvent::ConnectionFailed {
                reason: "max reconnect attempts reached".to_string(),
            });
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, attempt: u32) {
        let timer = self.root.child_token();
        if let Some(previous) = self.lock().reconnect_timer.replace(timer.clone()) {
            previous.cancel();
        }

        let delay = self.config.reconnect_delay;
        info!(
            attempt,
            max_attempts = self.config.max_reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        self.emit(ClientEvent::Reconnecting { attempt });

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            // Failures were already logged and reported as events.
            let _ = inner.connect().await;
        });
    }

    fn outbound(&self) -> Result<mpsc::Sender<String>> {
        let shared = self.lock();
        match (&shared.state, &shared.session) {
            (ConnectionState::Connected, Some(session)) => Ok(session.outbound.clone()),
            _ => Err(ClientError::NotConnected),
        }
    }

    /// Sends `envelope` and waits for the reply carrying the same id.
    async fn request(&self, envelope: Envelope, expected: MessageType) -> Result<Envelope> {
        let outbound = self.outbound()?;
        let frame = envelope.to_frame()?;
        let (guard, rx) = self.pending.register(envelope.id.clone());

        let span = client_request_span!(envelope.id.as_str(), envelope.message_type);
        async {
            let start = Instant::now();
            let outcome = match outbound.send(frame).await {
                Err(_) => Err(ClientError::ConnectionLost),
                Ok(()) => match tokio::time::timeout(self.config.timeout, rx).await {
                    Err(_) => Err(ClientError::Timeout {
                        request_id: envelope.id.clone(),
                        timeout_ms: self.config.timeout.as_millis() as u64,
                    }),
                    Ok(Err(_)) => Err(ClientError::ConnectionLost),
                    Ok(Ok(result)) => result,
                },
            };
            drop(guard);
            record_duration("request.duration_ms", start.elapsed());

            let reply = outcome.inspect_err(|e| record_error(e))?;
            match reply.message_type {
                MessageType::Error => {
                    let payload: ErrorPayload = reply.payload_as()?;
                    debug!(code = %payload.code, "Server returned an error");
                    Err(ClientError::Remote {
                        code: payload.code,
                        message: payload.message,
                        details: payload.details,
                    })
                }
                actual if actual == expected => Ok(reply),
                actual => Err(ClientError::UnexpectedResponse { expected, actual }),
            }
        }
        .instrument(span)
        .await
    }

    fn handle_frame(&self, raw: &str) {
        let envelope = match codec::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Discarding malformed frame from server");
                return;
            }
        };

        if envelope.id == UNKNOWN_ID && envelope.message_type == MessageType::Error {
            let payload = envelope.payload_as::<ErrorPayload>().ok();
            warn!(
                code = payload.as_ref().map(|p| p.code.as_str()).unwrap_or("?"),
                message = payload.as_ref().map(|p| p.message.as_str()).unwrap_or(""),
                "Server reported an uncorrelated error"
            );
            return;
        }

        let id = envelope.id.clone();
        let message_type = envelope.message_type;
        if !self.pending.resolve(envelope) {
            if message_type == MessageType::Pong {
                debug!(request_id = %id, "Heartbeat acknowledged");
            } else {
                debug!(request_id = %id, message_type = %message_type, "No pending request, discarding");
            }
        }
    }
}

async fn write_loop(
    inner: Arc<ClientInner>,
    mut sink: SplitSink<FramedStream, String>,
    mut rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
    generation: u64,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(frame) => frame,
                None => break,
            },
        };
        if let Err(e) = sink.send(frame).await {
            warn!(error = %e, "Write failed");
            inner.handle_connection_lost(generation);
            break;
        }
    }
    // Flush and half-close: the orderly close a server sees on disconnect.
    let _ = sink.close().await;
}

async fn read_loop(
    inner: Arc<ClientInner>,
    mut stream: SplitStream<FramedStream>,
    cancel: CancellationToken,
    generation: u64,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            next = stream.next() => match next {
                Some(Ok(Frame::Line(line))) => inner.handle_frame(&line),
                Some(Ok(rejected)) => {
                    warn!(reason = rejected.rejection(), "Discarding unreadable frame from server");
                }
                Some(Err(e)) => {
                    debug!(error = %e, "Read failed");
                    break;
                }
                None => {
                    debug!("Server closed connection");
                    break;
                }
            },
        }
    }
    inner.handle_connection_lost(generation);
}

async fn heartbeat_loop(inner: Arc<ClientInner>, cancel: CancellationToken, generation: u64) {
    let interval = inner.config.heartbeat_interval;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let sent = match (inner.outbound(), Envelope::ping().to_frame()) {
                    (Ok(outbound), Ok(frame)) => outbound.send(frame).await.is_ok(),
                    _ => false,
                };
                if !sent {
                    warn!("Heartbeat failed");
                    inner.handle_connection_lost(generation);
                    return;
                }
                debug!("Heartbeat sent");
            }
        }
    }
}
