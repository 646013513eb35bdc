//! # fleet-dispatch
//!
//! The decision-making layer of the dispatch subsystem:
//!
//! - [`ProximityMatcher`]: finds couriers eligible to receive a new order:
//!   coarse bounding-box pre-filter through the location store, exact
//!   haversine re-check, ranked result
//! - [`DispatchCoordinator`]: performs one order→courier assignment
//!   transactionally with respect to the external order store, then fans
//!   out notifications
//!
//! Both consume their collaborators (`CourierLocationStore`, `OrderStore`)
//! through the traits in `fleet-core` and never own persistence.

#![deny(unsafe_code)]

pub mod coordinator;
pub mod matcher;

pub use coordinator::{CoordinatorConfig, DispatchCoordinator};
pub use matcher::ProximityMatcher;
