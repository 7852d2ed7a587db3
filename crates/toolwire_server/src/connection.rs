//! Per-connection tasks and the tracked connection set.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use toolwire_core::transport::{self, Frame};
use toolwire_core::{Envelope, ErrorCode, UNKNOWN_ID};
use tracing::{Instrument, debug, warn};

use crate::dispatch::Dispatcher;

const OUTBOUND_CAPACITY: usize = 256;

pub type ConnectionId = u64;

/// Live connections, each with the token that closes it.
///
/// Admission and insertion happen under one lock so the count can never
/// exceed `max_connections`.
pub struct ConnectionTracker {
    max_connections: usize,
    next_id: AtomicU64,
    connections: Mutex<HashMap<ConnectionId, CancellationToken>>,
    shutdown: CancellationToken,
}

impl ConnectionTracker {
    pub fn new(max_connections: usize, shutdown: CancellationToken) -> Self {
        Self {
            max_connections,
            next_id: AtomicU64::new(1),
            connections: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    /// Reserves a slot, or `None` when the server is full.
    pub fn try_admit(&self) -> Option<(ConnectionId, CancellationToken)> {
        let mut connections = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        if connections.len() >= self.max_connections {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();
        connections.insert(id, token.clone());
        Some((id, token))
    }

    /// Returns whether the connection was still tracked.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels every connection and empties the set.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (_, token) in &drained {
            token.cancel();
        }
        drained.len()
    }
}

/// Serves one admitted connection until the peer leaves or `cancel` fires.
///
/// Replies are queued to a writer task, so a slow tool never blocks reading
/// the next frame and responses go out in completion order.
pub(crate) async fn serve_connection(
    stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) {
    let (mut sink, mut frames) = transport::framed(stream).split();
    let (tx, mut rx) = mpsc::channel::<Envelope>(OUTBOUND_CAPACITY);

    let writer_cancel = cancel.clone();
    let writer = tokio::spawn(
        async move {
            loop {
                let envelope = tokio::select! {
                    _ = writer_cancel.cancelled() => break,
                    next = rx.recv() => match next {
                        Some(envelope) => envelope,
                        None => break,
                    },
                };
                let frame = match envelope.to_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(request_id = %envelope.id, error = %e, "Dropping unserializable reply");
                        continue;
                    }
                };
                if let Err(e) = sink.send(frame).await {
                    debug!(error = %e, "Write failed, closing writer");
                    break;
                }
            }
            // Flushes and shuts down the write half.
            let _ = sink.close().await;
        }
        .in_current_span(),
    );

    let mut in_flight = JoinSet::new();
    let peer_left = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Connection cancelled");
                break false;
            }
            next = frames.next() => match next {
                Some(Ok(Frame::Line(line))) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let dispatcher = Arc::clone(&dispatcher);
                    let tx = tx.clone();
                    in_flight.spawn(
                        async move {
                            if let Some(reply) = dispatcher.handle_frame(&line).await {
                                let _ = tx.send(reply).await;
                            }
                        }
                        .in_current_span(),
                    );
                }
                Some(Ok(rejected)) => {
                    let reason = rejected.rejection().unwrap_or("unreadable frame");
                    warn!(reason, "Discarding unreadable frame");
                    let reply = Envelope::error(UNKNOWN_ID, ErrorCode::ParseError, reason, None);
                    let _ = tx.send(reply).await;
                }
                Some(Err(e)) => {
                    debug!(error = %e, "Read failed");
                    break true;
                }
                None => {
                    debug!("Peer closed connection");
                    break true;
                }
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "Dispatch task failed");
                }
            }
        }
    };

    // A peer that only half-closed still gets replies to what it sent.
    // Only cancellation abandons in-flight requests.
    if peer_left {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                joined = in_flight.join_next() => match joined {
                    Some(Err(e)) => warn!(error = %e, "Dispatch task failed"),
                    Some(Ok(())) => {}
                    None => break,
                },
            }
        }
    }
    in_flight.shutdown().await;

    // The writer exits once every queued reply is written, or on cancel.
    drop(tx);
    let _ = writer.await;
    cancel.cancel();
}

/// Tells a peer the server is full, then closes.
pub(crate) async fn reject(stream: TcpStream, peer: SocketAddr) {
    let mut framed = transport::framed(stream);
    let envelope = Envelope::error(
        UNKNOWN_ID,
        ErrorCode::ServerBusy,
        "Server busy: connection limit reached",
        None,
    );
    match envelope.to_frame() {
        Ok(frame) => {
            if let Err(e) = framed.send(frame).await {
                debug!(peer = %peer, error = %e, "Failed to send busy notice");
            }
        }
        Err(e) => warn!(error = %e, "Failed to encode busy notice"),
    }
    let _ = SinkExt::<String>::close(&mut framed).await;
}
