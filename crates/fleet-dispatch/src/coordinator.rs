//! One order→courier assignment, recorded durably and fanned out.
//!
//! Per-request state machine: Validating → Recording → Notifying → Done,
//! with `Failed(reason)` reachable from any state. Recording is the only
//! step with durable effects; once it commits, a caller abort cannot undo
//! it, and a failed notification never rolls it back.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use fleet_core::{
    AssignmentRequest, AssignmentResult, CourierId, CourierLocationStore, DispatchError,
    OrderStore, ReassignPolicy, Result,
};
use fleet_events::message::{DispatchMessage, OrderAssignedPayload, OrderAssignmentPayload};
use fleet_registry::NotificationBroadcaster;

/// Tuning for the coordinator.
#[derive(Clone, Copy, Debug)]
pub struct CoordinatorConfig {
    /// What to do when the order is already assigned to a different courier.
    pub reassign_policy: ReassignPolicy,
    /// Deadline for each external-store round-trip.
    pub store_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            reassign_policy: ReassignPolicy::LastWriterWins,
            store_timeout: Duration::from_secs(2),
        }
    }
}

/// Orchestrates a single assignment against the external order store, then
/// triggers notification fan-out.
pub struct DispatchCoordinator {
    orders: Arc<dyn OrderStore>,
    locations: Arc<dyn CourierLocationStore>,
    broadcaster: Arc<NotificationBroadcaster>,
    config: CoordinatorConfig,
}

impl DispatchCoordinator {
    /// Create a coordinator with explicit configuration.
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        locations: Arc<dyn CourierLocationStore>,
        broadcaster: Arc<NotificationBroadcaster>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            orders,
            locations,
            broadcaster,
            config,
        }
    }

    /// Assign one order to one courier.
    ///
    /// 1. *Validating*: the courier must exist; a courier marked unavailable
    ///    is not a hard failure: dispatch can override, and the result is
    ///    flagged with `rider_unavailable_warning`.
    /// 2. *Recording*: the order-to-courier link and an audit entry are
    ///    written in one atomic unit. Failure here aborts the request with
    ///    no partial state observable.
    /// 3. *Notifying*: best-effort push to the courier's channel; an offline
    ///    courier yields `delivered: false`, never an error.
    /// 4. Dashboards get an `order_assigned` summary regardless of the
    ///    courier delivery outcome.
    ///
    /// Re-invoking with the same `(order_id, courier_id)` is safe: the
    /// Recording step is an upsert. Reassigning to a different courier is
    /// governed by [`CoordinatorConfig::reassign_policy`].
    #[instrument(skip(self, request), fields(order_id = %request.order_id, rider_id = %courier_id))]
    pub async fn assign(
        &self,
        courier_id: CourierId,
        request: AssignmentRequest,
    ) -> Result<AssignmentResult> {
        // Validating
        let status = tokio::time::timeout(
            self.config.store_timeout,
            self.locations.courier_status(courier_id),
        )
        .await
        .map_err(|_| DispatchError::Timeout("courier lookup".into()))??
        .ok_or(DispatchError::CourierNotFound(courier_id))?;

        let rider_unavailable_warning = !status.available;
        if rider_unavailable_warning {
            warn!("assigning order to rider marked unavailable");
        }

        // Recording: the one durable step, atomic in the store.
        let audit_entry = format!(
            "Order {} assigned to rider {courier_id} by dispatch",
            request.order_id
        );
        let outcome = tokio::time::timeout(
            self.config.store_timeout,
            self.orders.record_assignment(
                request.order_id,
                courier_id,
                &audit_entry,
                self.config.reassign_policy,
            ),
        )
        .await
        .map_err(|_| DispatchError::Timeout("assignment recording".into()))??;

        if let Some(previous) = outcome.previous_courier {
            if previous != courier_id {
                info!(previous_rider = %previous, "order reassigned");
            }
        }

        // Notifying: best-effort, after the durable write.
        let delivered = self.broadcaster.send_to_courier(
            courier_id,
            DispatchMessage::OrderAssignment(OrderAssignmentPayload {
                order_id: request.order_id,
                description: request.description.clone(),
                customer_name: request.customer_name.clone(),
                address: request.delivery_address.clone(),
                priority: request.priority,
            }),
        );
        if !delivered {
            warn!("assignment recorded but rider notification not delivered");
        }

        let _ = self
            .broadcaster
            .broadcast_to_dashboards(DispatchMessage::OrderAssigned(OrderAssignedPayload {
                rider_id: courier_id,
                order_id: request.order_id,
                delivery_success: delivered,
            }));

        info!(delivered, created = outcome.created, "order assignment complete");
        Ok(AssignmentResult {
            assignment_id: request.order_id,
            courier_id,
            delivered,
            rider_unavailable_warning,
            assigned_at: Utc::now(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
