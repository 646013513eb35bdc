//! # fleet-core
//!
//! Foundation types, errors, branded IDs, and collaborator traits for the
//! fleet dispatch system.
//!
//! This crate provides the shared vocabulary that all other fleet crates
//! depend on:
//!
//! - **Branded IDs**: `CourierId`, `OrderId`, `MessageId`,
//!   `DashboardSessionId` as newtypes for type safety
//! - **Domain types**: `Coordinate`, `CandidateCourier`,
//!   `AssignmentRequest`, `AssignmentResult`, `ConnectionStats`
//! - **Errors**: `DispatchError` hierarchy via `thiserror`, with wire codes
//! - **Collaborator traits**: `CourierLocationStore` and `OrderStore`, the
//!   narrow interfaces through which the core consumes external persistence

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod stores;
pub mod types;

pub use errors::{DispatchError, Result};
pub use ids::{CourierId, DashboardSessionId, MessageId, OrderId};
pub use stores::{
    CourierLocationStore, CourierRecord, CourierStatus, OrderStore, ReassignPolicy, UpsertOutcome,
};
pub use types::{
    AssignmentRequest, AssignmentResult, BoundingBox, CandidateCourier, ConnectionStats,
    Coordinate, Priority,
};
