//! Domain types shared across the dispatch subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CourierId, OrderId};

/// A geographic point in decimal degrees.
///
/// Validity (range and NaN checks) is enforced at the boundary by
/// `fleet_geo::is_valid_coordinate`; a stored `Coordinate` is assumed valid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate from raw degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A rectangular pre-filter region derived from a center point and radius.
///
/// The box over-approximates the circle; callers must re-check candidates
/// with the exact distance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

impl BoundingBox {
    /// Whether a coordinate falls inside the box (inclusive).
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// Assignment priority, as set by the dispatcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Deliver when convenient.
    Low,
    /// Standard delivery.
    #[default]
    Normal,
    /// Deliver ahead of normal orders.
    High,
    /// Deliver immediately.
    Urgent,
}

/// A courier eligible to receive an order, produced by a proximity search.
///
/// Ephemeral: recomputed per search, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateCourier {
    /// Courier id.
    pub id: CourierId,
    /// Courier display name.
    pub name: String,
    /// Last known location.
    pub location: Coordinate,
    /// Exact distance from the search origin, rounded to 2 decimals.
    pub distance_km: f64,
    /// Whether the courier currently has a live channel.
    pub connected: bool,
}

/// A request to assign one order to one courier.
///
/// Produced by an external caller, consumed once by the coordinator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    /// Order to assign.
    pub order_id: OrderId,
    /// Order description shown to the courier.
    pub description: String,
    /// Customer name.
    pub customer_name: String,
    /// Delivery address.
    pub delivery_address: String,
    /// Assignment priority.
    #[serde(default)]
    pub priority: Priority,
}

/// Outcome of an assignment, distinguishing "recorded" from "delivered".
///
/// A courier being offline is never conflated with the assignment failing:
/// `delivered` only reports whether the push notification reached the
/// courier's channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult {
    /// Id of the recorded assignment (the order id).
    pub assignment_id: OrderId,
    /// Courier the order was assigned to.
    pub courier_id: CourierId,
    /// Whether the `order_assignment` push reached the courier.
    pub delivered: bool,
    /// Set when the courier was marked unavailable but dispatch overrode it.
    pub rider_unavailable_warning: bool,
    /// When the assignment was recorded.
    pub assigned_at: DateTime<Utc>,
}

/// Live connection counters, as shown on dashboards and `/health`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    /// Couriers with a live channel.
    pub connected_riders: usize,
    /// Dashboard sessions with a live channel.
    pub connected_dispatchers: usize,
    /// Sum of both.
    pub total_connections: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
