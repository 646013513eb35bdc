//! Error hierarchy for the dispatch subsystem.
//!
//! Propagation policy:
//!
//! - Validation errors (`InvalidInput`) fail fast, before any side effect.
//! - Store errors during assignment recording abort the whole call; no
//!   partial commit is ever observable.
//! - Delivery failures are *not* errors; a courier being offline is a valid
//!   terminal state, reported as a boolean in results.

use thiserror::Error;

use crate::ids::{CourierId, OrderId};

/// Top-level error type for dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Bad coordinates or radius, rejected before any side effect.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The courier does not exist in the external store.
    #[error("courier {0} not found")]
    CourierNotFound(CourierId),

    /// The order is already assigned to a different courier and the
    /// configured reassignment policy rejects overwrites.
    #[error("order {order_id} is already assigned to courier {assigned_to}")]
    AssignmentConflict {
        /// Order that was being assigned.
        order_id: OrderId,
        /// Courier currently holding the assignment.
        assigned_to: CourierId,
    },

    /// The external store failed or was unreachable. Transient; retry policy
    /// belongs to the caller.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A bounded operation exceeded its deadline.
    #[error("{0} timed out")]
    Timeout(String),
}

impl DispatchError {
    /// Machine-readable wire code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::CourierNotFound(_) => "COURIER_NOT_FOUND",
            Self::AssignmentConflict { .. } => "ASSIGNMENT_CONFLICT",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
        }
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Timeout(_))
    }
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
