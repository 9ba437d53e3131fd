//! WebSocket client connection state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use seatcast_core::{ConnectionId, OutboundEvent};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

/// A connected WebSocket client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Application-level identity (user ID), attached at most once.
    identity: OnceLock<String>,
    /// Send channel to the client's WebSocket write task.
    tx: mpsc::Sender<Arc<String>>,
    /// Cancelled once the delivery strategy has seen this connection.
    registered: CancellationToken,
    /// Whether the client has responded to the last ping.
    is_alive: AtomicBool,
    /// When the last Pong (or any activity) was received.
    last_pong: Mutex<Instant>,
    /// Count of messages dropped due to full or closed channel.
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection with no identity attached.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            identity: OnceLock::new(),
            tx,
            registered: CancellationToken::new(),
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Attach the identity tag supplied at handshake.
    ///
    /// Returns `false` (and keeps the existing tag) if one was already set.
    pub fn attach_identity(&self, user_id: String) -> bool {
        self.identity.set(user_id).is_ok()
    }

    /// The attached identity tag, if any.
    pub fn identity(&self) -> Option<&str> {
        self.identity.get().map(String::as_str)
    }

    /// Queue a text frame for the client.
    ///
    /// Returns `false` if the channel is full or closed, and increments
    /// the dropped message counter.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            ::metrics::counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
            false
        }
    }

    /// Wrap `data` in an [`OutboundEvent`] envelope and queue it.
    pub fn emit(&self, event_name: &str, data: Value) -> bool {
        match OutboundEvent::new(event_name, data).to_json() {
            Ok(json) => self.send(Arc::new(json)),
            Err(e) => {
                warn!(conn_id = %self.id, event_name, error = %e, "failed to serialize event");
                false
            }
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong or any inbound frame received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Record that the delivery strategy has registered this connection.
    pub fn mark_registered(&self) {
        self.registered.cancel();
    }

    /// Whether [`mark_registered`](Self::mark_registered) has been called.
    pub fn is_registered(&self) -> bool {
        self.registered.is_cancelled()
    }

    /// Resolves once the connection is registered with the strategy.
    pub async fn registered(&self) {
        self.registered.cancelled().await;
    }
}
