//! Outstanding requests keyed by envelope id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use toolwire_core::Envelope;

use crate::error::ClientError;

type Responder = oneshot::Sender<Result<Envelope, ClientError>>;
pub(crate) type ResponseReceiver = oneshot::Receiver<Result<Envelope, ClientError>>;

#[derive(Clone, Default)]
pub(crate) struct PendingRequests {
    inner: Arc<Mutex<HashMap<String, Responder>>>,
}

impl PendingRequests {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Responder>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `id`. The entry lives until it is resolved, failed, or the
    /// returned guard is dropped.
    pub fn register(&self, id: String) -> (PendingGuard, ResponseReceiver) {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id.clone(), tx);
        let guard = PendingGuard {
            pending: self.clone(),
            id,
        };
        (guard, rx)
    }

    /// Hands a response to its waiter. `false` if nobody is waiting for it.
    pub fn resolve(&self, envelope: Envelope) -> bool {
        let Some(tx) = self.lock().remove(&envelope.id) else {
            return false;
        };
        tx.send(Ok(envelope)).is_ok()
    }

    /// Fails every waiter, returning how many there were.
    pub fn fail_all(&self, error: impl Fn() -> ClientError) -> usize {
        let drained: Vec<Responder> = self.lock().drain().map(|(_, tx)| tx).collect();
        let count = drained.len();
        for tx in drained {
            let _ = tx.send(Err(error()));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn remove(&self, id: &str) {
        self.lock().remove(id);
    }
}

pub(crate) struct PendingGuard {
    pending: PendingRequests,
    id: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}
