//! Open connection bookkeeping for shutdown.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    open: BTreeMap<u64, Tracked>,
}

#[derive(Debug)]
struct Tracked {
    key: String,
    destroy: CancellationToken,
}

/// Open connections keyed `"{ip}:{port}"`, in accept order.
///
/// Shared between the accept loop and connection tasks.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    inner: Arc<Mutex<Inner>>,
}

impl ConnectionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a connection. It stays tracked until the guard drops.
    #[must_use]
    pub fn track(&self, remote: SocketAddr) -> ConnectionGuard {
        let destroy = CancellationToken::new();
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.open.insert(
            id,
            Tracked {
                key: connection_key(remote),
                destroy: destroy.clone(),
            },
        );
        ConnectionGuard {
            id,
            tracker: self.clone(),
            destroy,
        }
    }

    /// Keys of the open connections.
    #[must_use]
    pub fn open_connections(&self) -> Vec<String> {
        self.inner
            .lock()
            .open
            .values()
            .map(|tracked| tracked.key.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().open.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signal every open connection to close now. Returns how many were
    /// signalled.
    pub fn destroy_all(&self) -> usize {
        let signalled: Vec<(String, CancellationToken)> = self
            .inner
            .lock()
            .open
            .values()
            .map(|tracked| (tracked.key.clone(), tracked.destroy.clone()))
            .collect();

        for (key, destroy) in &signalled {
            tracing::debug!(connection = %key, "Destroying connection");
            destroy.cancel();
        }
        signalled.len()
    }

    fn untrack(&self, id: u64) {
        self.inner.lock().open.remove(&id);
    }
}

/// Removes its connection from the tracker on drop.
#[derive(Debug)]
pub struct ConnectionGuard {
    id: u64,
    tracker: ConnectionTracker,
    destroy: CancellationToken,
}

impl ConnectionGuard {
    /// Completes when the connection has been told to close.
    pub fn destroyed(&self) -> WaitForCancellationFuture<'_> {
        self.destroy.cancelled()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.tracker.untrack(self.id);
    }
}

fn connection_key(remote: SocketAddr) -> String {
    format!("{}:{}", remote.ip(), remote.port())
}
