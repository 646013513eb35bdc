//! Targeted and broadcast delivery of dispatch messages.
//!
//! Delivery is best-effort and never blocks: a courier being offline is a
//! valid terminal state reported as `false`, not an error, and retry policy
//! belongs to the caller.

use std::sync::Arc;

use tracing::{debug, info, warn};

use fleet_core::{CandidateCourier, Coordinate, CourierId, OrderId};
use fleet_events::envelope::MessageEnvelope;
use fleet_events::message::{
    DispatchMessage, NewOrderPayload, ProximityResultsPayload,
};

use crate::registry::ConnectionRegistry;

/// Per-recipient outcome of a proximity notification round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProximityNotification {
    /// Connected candidates that received the targeted push.
    pub notified: Vec<CourierId>,
    /// Connected candidates whose send failed.
    pub failed: Vec<CourierId>,
    /// How many dashboards received the summary broadcast.
    pub dashboards: usize,
}

/// Sends dispatch messages to one courier or to all dashboards.
pub struct NotificationBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl NotificationBroadcaster {
    /// Create a broadcaster over a registry.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this broadcaster resolves channels through.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Send one message to one courier.
    ///
    /// `false` if the courier has no registered channel or the send fails.
    /// No retries.
    pub fn send_to_courier(&self, id: CourierId, message: DispatchMessage) -> bool {
        let message_type = message.message_type();
        let Some(channel) = self.registry.courier_channel(id) else {
            warn!(rider_id = %id, message_type, "failed to send: rider not connected");
            return false;
        };
        if !channel.is_open() {
            warn!(rider_id = %id, message_type, "failed to send: rider channel closed");
            return false;
        }

        let envelope = MessageEnvelope::new(message);
        let json = match envelope.to_json() {
            Ok(json) => Arc::new(json),
            Err(e) => {
                warn!(rider_id = %id, message_type, error = %e, "failed to serialize message");
                return false;
            }
        };

        let sent = channel.send(json);
        if sent {
            self.registry.touch_courier(id);
            debug!(rider_id = %id, message_type, "message sent to rider");
        } else {
            warn!(rider_id = %id, message_type, "failed to send: channel queue rejected message");
        }
        sent
    }

    /// Broadcast one message to every dashboard; returns the delivered count.
    pub fn broadcast_to_dashboards(&self, message: DispatchMessage) -> usize {
        self.registry.notify_dashboards(message)
    }

    /// Push a `new_order_notification` to each connected candidate and a
    /// `proximity_search_results` summary to all dashboards.
    pub fn notify_proximity_result(
        &self,
        order_id: OrderId,
        origin: Coordinate,
        radius_km: f64,
        candidates: &[CandidateCourier],
    ) -> ProximityNotification {
        let mut outcome = ProximityNotification::default();

        for candidate in candidates.iter().filter(|c| c.connected) {
            let message = DispatchMessage::NewOrderNotification(NewOrderPayload {
                order_id,
                origin,
                distance_km: candidate.distance_km,
            });
            if self.send_to_courier(candidate.id, message) {
                outcome.notified.push(candidate.id);
            } else {
                outcome.failed.push(candidate.id);
            }
        }

        let connected_count = outcome.notified.len() + outcome.failed.len();
        outcome.dashboards =
            self.broadcast_to_dashboards(DispatchMessage::ProximitySearchResults(
                ProximityResultsPayload {
                    order_id,
                    origin,
                    candidates: candidates.to_vec(),
                    total_found: candidates.len(),
                    connected_count,
                    search_radius_km: radius_km,
                },
            ));

        info!(
            order_id = %order_id,
            total_found = candidates.len(),
            notified = outcome.notified.len(),
            failed = outcome.failed.len(),
            dashboards = outcome.dashboards,
            "proximity notifications dispatched"
        );
        outcome
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
