//! Message types pushed to couriers and dashboards.
//!
//! [`DispatchMessage`] enumerates every message this system sends over a
//! live channel. Variants serialize to the wire as
//! `{ "type": "<tag>", "data": { ... } }`; the surrounding envelope adds
//! `timestamp` and `messageId`.

use fleet_core::{CandidateCourier, ConnectionStats, Coordinate, CourierId, OrderId, Priority};
use serde::{Deserialize, Serialize};

/// Everything this system pushes over a live channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DispatchMessage {
    /// A courier's position changed; fanned out to dashboards.
    LocationUpdate(LocationUpdatePayload),
    /// An order was assigned to the receiving courier.
    OrderAssignment(OrderAssignmentPayload),
    /// Assignment outcome summary for dashboards.
    OrderAssigned(OrderAssignedPayload),
    /// A courier came online.
    RiderConnected(RiderPresencePayload),
    /// A courier went offline (explicit disconnect, eviction, or sweep).
    RiderDisconnected(RiderPresencePayload),
    /// A courier reported a status change.
    RiderStatusUpdate(RiderStatusPayload),
    /// Snapshot of currently connected couriers, pushed to a dashboard on
    /// connect.
    ConnectedRidersList(ConnectedRidersPayload),
    /// Proximity search summary for dashboards.
    ProximitySearchResults(ProximityResultsPayload),
    /// Targeted push to one connected candidate courier about a new order.
    NewOrderNotification(NewOrderPayload),
    /// Welcome message after a courier channel handshake.
    ConnectionEstablished(ConnectionEstablishedPayload),
    /// Welcome message after a dashboard channel handshake.
    DispatchConnected(DispatchConnectedPayload),
    /// Response to a dashboard's `get_rider_list` request.
    RiderList(RiderListPayload),
    /// Response to a dashboard's `get_stats` request.
    ConnectionStats(ConnectionStatsPayload),
    /// Free-form operator message relayed to a courier.
    #[serde(rename = "dispatch_message")]
    OperatorMessage(OperatorMessagePayload),
    /// Ack to the dashboard that asked to relay a message.
    MessageSentResult(MessageSentResultPayload),
    /// Ack to a courier for a processed location update.
    LocationUpdateAcknowledged(LocationAckPayload),
    /// Ack to a courier for a processed status update.
    StatusUpdateAcknowledged(StatusAckPayload),
    /// Structured error sent to the offending client.
    Error(ErrorPayload),
}

impl DispatchMessage {
    /// The wire tag for this message, for logging.
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            Self::LocationUpdate(_) => "location_update",
            Self::OrderAssignment(_) => "order_assignment",
            Self::OrderAssigned(_) => "order_assigned",
            Self::RiderConnected(_) => "rider_connected",
            Self::RiderDisconnected(_) => "rider_disconnected",
            Self::RiderStatusUpdate(_) => "rider_status_update",
            Self::ConnectedRidersList(_) => "connected_riders_list",
            Self::ProximitySearchResults(_) => "proximity_search_results",
            Self::NewOrderNotification(_) => "new_order_notification",
            Self::ConnectionEstablished(_) => "connection_established",
            Self::DispatchConnected(_) => "dispatch_connected",
            Self::RiderList(_) => "rider_list",
            Self::ConnectionStats(_) => "connection_stats",
            Self::OperatorMessage(_) => "dispatch_message",
            Self::MessageSentResult(_) => "message_sent_result",
            Self::LocationUpdateAcknowledged(_) => "location_update_acknowledged",
            Self::StatusUpdateAcknowledged(_) => "status_update_acknowledged",
            Self::Error(_) => "error",
        }
    }

    /// Presence message for a courier coming online.
    #[must_use]
    pub fn rider_connected(rider_id: CourierId) -> Self {
        Self::RiderConnected(RiderPresencePayload {
            rider_id,
            ts: now_ts(),
        })
    }

    /// Presence message for a courier going offline.
    #[must_use]
    pub fn rider_disconnected(rider_id: CourierId) -> Self {
        Self::RiderDisconnected(RiderPresencePayload {
            rider_id,
            ts: now_ts(),
        })
    }

    /// Structured error with a wire code.
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            code: code.into(),
            message: message.into(),
        })
    }
}

/// Current UTC time as an RFC 3339 string, the wire timestamp format.
#[must_use]
pub fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// `location_update` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdatePayload {
    /// Courier that moved.
    pub rider_id: CourierId,
    /// New latitude.
    pub lat: f64,
    /// New longitude.
    pub lng: f64,
    /// When the position was reported.
    pub ts: String,
}

/// `order_assignment` payload, pushed to the assigned courier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAssignmentPayload {
    /// Assigned order.
    pub order_id: OrderId,
    /// Order description.
    pub description: String,
    /// Customer name.
    pub customer_name: String,
    /// Delivery address.
    pub address: String,
    /// Assignment priority.
    pub priority: Priority,
}

/// `order_assigned` payload, broadcast to dashboards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAssignedPayload {
    /// Courier the order went to.
    pub rider_id: CourierId,
    /// The order.
    pub order_id: OrderId,
    /// Whether the `order_assignment` push reached the courier.
    pub delivery_success: bool,
}

/// `rider_connected` / `rider_disconnected` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderPresencePayload {
    /// Courier whose presence changed.
    pub rider_id: CourierId,
    /// When the change happened.
    pub ts: String,
}

/// `rider_status_update` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderStatusPayload {
    /// Courier that reported.
    pub rider_id: CourierId,
    /// Courier-reported status string (e.g. `"online"`, `"on_break"`).
    pub status: String,
    /// When the status was reported.
    pub ts: String,
}

/// One entry of the `connected_riders_list` snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedRider {
    /// Courier id.
    pub rider_id: CourierId,
    /// When the channel was registered.
    pub connected_at: String,
    /// Last activity on the channel.
    pub last_activity: String,
}

/// `connected_riders_list` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedRidersPayload {
    /// Currently connected couriers.
    pub riders: Vec<ConnectedRider>,
}

/// `proximity_search_results` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityResultsPayload {
    /// Order that triggered the search.
    pub order_id: OrderId,
    /// Search origin.
    pub origin: Coordinate,
    /// Ranked candidates, closest first.
    pub candidates: Vec<CandidateCourier>,
    /// Total candidates within the radius.
    pub total_found: usize,
    /// How many of them have a live channel.
    pub connected_count: usize,
    /// Radius the search used.
    pub search_radius_km: f64,
}

/// `new_order_notification` payload, sent to one connected candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderPayload {
    /// The new order.
    pub order_id: OrderId,
    /// Pickup origin.
    pub origin: Coordinate,
    /// This candidate's distance from the origin.
    pub distance_km: f64,
}

/// `connection_established` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEstablishedPayload {
    /// The courier that connected.
    pub rider_id: CourierId,
    /// Human-readable greeting.
    pub message: String,
    /// Server clock at handshake.
    pub server_time: String,
}

/// `dispatch_connected` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConnectedPayload {
    /// Generated dashboard session id.
    pub session_id: String,
    /// Live connection counters.
    pub connection_stats: ConnectionStats,
    /// Currently connected courier ids, ascending.
    pub connected_riders: Vec<CourierId>,
    /// Server clock at handshake.
    pub server_time: String,
}

/// `rider_list` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderListPayload {
    /// Currently connected courier ids, ascending.
    pub connected_riders: Vec<CourierId>,
    /// Live connection counters.
    pub connection_stats: ConnectionStats,
    /// When the request was served.
    pub requested_at: String,
}

/// `connection_stats` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatsPayload {
    /// Live connection counters.
    #[serde(flatten)]
    pub stats: ConnectionStats,
    /// When the request was served.
    pub requested_at: String,
}

/// `dispatch_message` payload (operator → courier relay).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorMessagePayload {
    /// Always `"dispatch"`.
    pub from: String,
    /// Free-form operator text.
    pub message: String,
    /// Dashboard session that sent it.
    pub dispatch_session: String,
}

/// `message_sent_result` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSentResultPayload {
    /// Target courier.
    pub rider_id: CourierId,
    /// Whether the relay reached the courier.
    pub sent: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// `location_update_acknowledged` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAckPayload {
    /// The courier being acknowledged.
    pub rider_id: CourierId,
    /// Always `true` for a processed update.
    pub received: bool,
    /// Server clock when processed.
    pub server_time: String,
}

/// `status_update_acknowledged` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusAckPayload {
    /// The courier being acknowledged.
    pub rider_id: CourierId,
    /// The status echoed back.
    pub status: String,
    /// Always `true` for a processed update.
    pub received: bool,
}

/// `error` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// Machine-readable code (e.g. `INVALID_LOCATION_DATA`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
