//! Transport envelope for outbound messages.
//!
//! Wire format:
//! ```json
//! { "type": "location_update", "data": {...}, "timestamp": "2026-...", "messageId": "0195-..." }
//! ```
//!
//! The `messageId` (UUID v7) lets clients dedup replays; it carries no
//! server-side delivery guarantee.

use fleet_core::MessageId;
use serde::{Deserialize, Serialize};

use crate::message::{DispatchMessage, now_ts};

/// A [`DispatchMessage`] plus transport metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// The message, flattened to `type` + `data` on the wire.
    #[serde(flatten)]
    pub message: DispatchMessage,
    /// ISO 8601 timestamp stamped at send time.
    pub timestamp: String,
    /// Unique message id for client-side dedup.
    #[serde(rename = "messageId")]
    pub message_id: MessageId,
}

impl MessageEnvelope {
    /// Wrap a message with a fresh timestamp and message id.
    #[must_use]
    pub fn new(message: DispatchMessage) -> Self {
        Self {
            message,
            timestamp: now_ts(),
            message_id: MessageId::new(),
        }
    }

    /// Serialize to the wire JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
