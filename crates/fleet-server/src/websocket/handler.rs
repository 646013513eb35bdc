//! Inbound WebSocket message dispatch.
//!
//! Parses incoming text frames into the typed client-message enums and
//! applies them against the registry and broadcaster. Responses and acks go
//! back over the sender's own channel; fan-out goes through the
//! broadcaster.

use serde::Deserialize;
use tracing::{debug, warn};

use fleet_core::{Coordinate, CourierId, DashboardSessionId};
use fleet_events::message::{
    ConnectionStatsPayload, DispatchMessage, LocationAckPayload, LocationUpdatePayload,
    MessageSentResultPayload, OperatorMessagePayload, RiderListPayload, RiderStatusPayload,
    StatusAckPayload, now_ts,
};
use fleet_geo::is_valid_coordinate;
use fleet_registry::{Channel, send_envelope};

use crate::server::AppState;

/// Messages a courier client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RiderClientMessage {
    /// Position report.
    LocationUpdate {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },
    /// Free-form status report (e.g. `"online"`, `"on_break"`).
    StatusUpdate {
        /// Reported status.
        status: String,
    },
}

/// Messages a dashboard client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DispatchClientMessage {
    /// Request the current connected-rider list.
    GetRiderList,
    /// Request connection counters.
    GetStats,
    /// Relay a free-form message to one rider.
    SendToRider {
        /// Target rider.
        #[serde(rename = "riderId")]
        rider_id: CourierId,
        /// Message text.
        message: String,
    },
}

/// Handle one text frame from a courier connection.
pub fn handle_rider_message(
    state: &AppState,
    rider_id: CourierId,
    channel: &dyn Channel,
    text: &str,
) {
    let parsed: RiderClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(rider_id = %rider_id, error = %e, "unparseable rider message");
            let _ = send_envelope(
                channel,
                &DispatchMessage::error("UNKNOWN_MESSAGE_TYPE", format!("Invalid message: {e}")),
            );
            return;
        }
    };

    match parsed {
        RiderClientMessage::LocationUpdate {
            latitude,
            longitude,
        } => {
            let position = Coordinate::new(latitude, longitude);
            if !is_valid_coordinate(position) {
                warn!(rider_id = %rider_id, latitude, longitude, "rejected location update");
                let _ = send_envelope(
                    channel,
                    &DispatchMessage::error("INVALID_LOCATION_DATA", "Invalid location data"),
                );
                return;
            }

            state.registry.touch_courier(rider_id);
            let _ = state
                .broadcaster
                .broadcast_to_dashboards(DispatchMessage::LocationUpdate(LocationUpdatePayload {
                    rider_id,
                    lat: latitude,
                    lng: longitude,
                    ts: now_ts(),
                }));
            debug!(rider_id = %rider_id, latitude, longitude, "location update broadcast");

            let _ = send_envelope(
                channel,
                &DispatchMessage::LocationUpdateAcknowledged(LocationAckPayload {
                    rider_id,
                    received: true,
                    server_time: now_ts(),
                }),
            );
        }
        RiderClientMessage::StatusUpdate { status } => {
            state.registry.touch_courier(rider_id);
            let _ = state
                .broadcaster
                .broadcast_to_dashboards(DispatchMessage::RiderStatusUpdate(RiderStatusPayload {
                    rider_id,
                    status: status.clone(),
                    ts: now_ts(),
                }));

            let _ = send_envelope(
                channel,
                &DispatchMessage::StatusUpdateAcknowledged(StatusAckPayload {
                    rider_id,
                    status,
                    received: true,
                }),
            );
        }
    }
}

/// Handle one text frame from a dashboard connection.
pub fn handle_dispatch_message(
    state: &AppState,
    session_id: &DashboardSessionId,
    channel: &dyn Channel,
    text: &str,
) {
    let parsed: DispatchClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(session_id = %session_id, error = %e, "unparseable dispatch message");
            let _ = send_envelope(
                channel,
                &DispatchMessage::error("UNKNOWN_MESSAGE_TYPE", format!("Invalid message: {e}")),
            );
            return;
        }
    };

    state.registry.touch_dashboard(session_id);

    match parsed {
        DispatchClientMessage::GetRiderList => {
            let _ = send_envelope(
                channel,
                &DispatchMessage::RiderList(RiderListPayload {
                    connected_riders: state.registry.connected_courier_ids(),
                    connection_stats: state.registry.stats(),
                    requested_at: now_ts(),
                }),
            );
        }
        DispatchClientMessage::GetStats => {
            let _ = send_envelope(
                channel,
                &DispatchMessage::ConnectionStats(ConnectionStatsPayload {
                    stats: state.registry.stats(),
                    requested_at: now_ts(),
                }),
            );
        }
        DispatchClientMessage::SendToRider { rider_id, message } => {
            let sent = state.broadcaster.send_to_courier(
                rider_id,
                DispatchMessage::OperatorMessage(OperatorMessagePayload {
                    from: "dispatch".into(),
                    message,
                    dispatch_session: session_id.to_string(),
                }),
            );
            debug!(session_id = %session_id, rider_id = %rider_id, sent, "relayed dispatch message");

            let _ = send_envelope(
                channel,
                &DispatchMessage::MessageSentResult(MessageSentResultPayload {
                    rider_id,
                    sent,
                    message: if sent {
                        "Message sent successfully".into()
                    } else {
                        "Rider not connected or message failed".into()
                    },
                }),
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
