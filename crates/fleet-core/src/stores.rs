//! Collaborator traits for external persistence.
//!
//! The dispatch core never owns storage; it consumes the courier-location
//! and order stores through these narrow interfaces. Implementations live
//! with the embedding application (SQL, in-memory, whatever).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::ids::{CourierId, OrderId};
use crate::types::{BoundingBox, Coordinate};

/// A courier row as returned by the location store's bounding-box query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierRecord {
    /// Courier id.
    pub id: CourierId,
    /// Display name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
    /// Last known location.
    pub location: Coordinate,
    /// When the location was last reported.
    pub last_update: DateTime<Utc>,
}

/// Availability flags for a single courier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierStatus {
    /// Whether the courier account is active.
    pub active: bool,
    /// Whether the courier is accepting orders.
    pub available: bool,
}

/// Policy applied when an order is already assigned to a different courier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReassignPolicy {
    /// Overwrite the existing assignment silently.
    #[default]
    LastWriterWins,
    /// Fail with `AssignmentConflict`, leaving the existing assignment.
    Reject,
}

/// Outcome of recording an order-to-courier link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Whether a new order row was created (vs. an existing one updated).
    pub created: bool,
    /// The courier previously holding the assignment, if any.
    pub previous_courier: Option<CourierId>,
}

/// Read access to courier locations and status.
#[async_trait]
pub trait CourierLocationStore: Send + Sync {
    /// All couriers that are available, active, and whose last-known
    /// coordinate falls inside `bbox`.
    ///
    /// This is the coarse pre-filter; callers must re-check each record
    /// against the exact radius.
    async fn find_available_in_bounding_box(&self, bbox: &BoundingBox)
    -> Result<Vec<CourierRecord>>;

    /// Status flags for one courier; `None` when the courier does not exist.
    async fn courier_status(&self, id: CourierId) -> Result<Option<CourierStatus>>;
}

/// Write access to order assignments.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Record the order-to-courier link and append `audit_entry` to the
    /// order's audit log, in one atomic unit; a failure must leave no
    /// partial state observable.
    ///
    /// The upsert is insert-or-update. Under [`ReassignPolicy::Reject`] the
    /// implementation must refuse atomically (returning
    /// `DispatchError::AssignmentConflict`) when the order is already
    /// assigned to a different courier; under
    /// [`ReassignPolicy::LastWriterWins`] it overwrites and reports the
    /// previous assignee.
    async fn record_assignment(
        &self,
        order_id: OrderId,
        courier_id: CourierId,
        audit_entry: &str,
        policy: ReassignPolicy,
    ) -> Result<UpsertOutcome>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassign_policy_default_is_last_writer_wins() {
        assert_eq!(ReassignPolicy::default(), ReassignPolicy::LastWriterWins);
    }

    #[test]
    fn reassign_policy_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&ReassignPolicy::LastWriterWins).unwrap(),
            "\"last_writer_wins\""
        );
        let back: ReassignPolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(back, ReassignPolicy::Reject);
    }

    #[test]
    fn courier_record_wire_shape() {
        let record = CourierRecord {
            id: CourierId::new(1),
            name: "Chidi".into(),
            phone: "+2348000000000".into(),
            location: Coordinate::new(6.45, 3.54),
            last_update: Utc::now(),
        };
        let val = serde_json::to_value(&record).unwrap();
        assert_eq!(val["id"], 1);
        assert!(val.get("lastUpdate").is_some());
    }

    #[test]
    fn upsert_outcome_equality() {
        let a = UpsertOutcome {
            created: true,
            previous_courier: None,
        };
        let b = UpsertOutcome {
            created: true,
            previous_courier: None,
        };
        assert_eq!(a, b);
    }
}
