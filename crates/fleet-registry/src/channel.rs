//! The opaque duplex handle through which messages reach a connected party.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::warn;

use fleet_events::envelope::MessageEnvelope;
use fleet_events::message::DispatchMessage;

/// A non-owning handle to a transport-layer connection.
///
/// The transport layer owns the underlying socket; the registry only holds
/// this handle until told to remove it. `send` must never block: a full or
/// closed queue reports `false` and the message is dropped.
pub trait Channel: Send + Sync {
    /// Queue a serialized message for delivery. `false` if the channel is
    /// closed or its queue is full.
    fn send(&self, message: Arc<String>) -> bool;

    /// Whether the underlying transport still accepts messages.
    fn is_open(&self) -> bool;
}

/// [`Channel`] backed by a bounded tokio mpsc queue.
///
/// The gateway's per-connection write task drains the receiving end into
/// the socket. Liveness flags support heartbeat monitoring.
pub struct MpscChannel {
    /// Send side of the per-connection write queue.
    tx: mpsc::Sender<Arc<String>>,
    /// Whether the peer has responded since the last heartbeat check.
    is_alive: AtomicBool,
    /// Count of messages dropped due to a full queue.
    dropped_messages: AtomicU64,
}

impl MpscChannel {
    /// Wrap a write-queue sender.
    #[must_use]
    pub fn new(tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            tx,
            is_alive: AtomicBool::new(true),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Mark the peer as alive (pong or any activity received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if the peer was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Total messages dropped on a full queue.
    #[must_use]
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }
}

impl Channel for MpscChannel {
    fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Wrap `message` in a fresh envelope and send it on one channel.
pub fn send_envelope(channel: &dyn Channel, message: &DispatchMessage) -> bool {
    let envelope = MessageEnvelope::new(message.clone());
    match envelope.to_json() {
        Ok(json) => channel.send(Arc::new(json)),
        Err(e) => {
            warn!(message_type = message.message_type(), error = %e, "failed to serialize message");
            false
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
