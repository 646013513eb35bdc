//! # fleet-registry
//!
//! The single source of truth for "who is reachable now": a concurrent-safe
//! directory of live channels to couriers and dashboards, and the
//! broadcaster that fans dispatch messages out to them.
//!
//! - [`Channel`]: the opaque duplex handle the transport layer hands in
//! - [`MpscChannel`]: tokio mpsc-backed implementation used by the gateway
//! - [`ConnectionRegistry`]: register/unregister/sweep with ordered presence
//!   events emitted at the point of mutation
//! - [`NotificationBroadcaster`]: targeted and broadcast delivery with
//!   per-recipient outcomes
//!
//! No operation sends on a channel while holding a registry lock; sends
//! always happen against a locally captured snapshot.

#![deny(unsafe_code)]

pub mod broadcaster;
pub mod channel;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use broadcaster::{NotificationBroadcaster, ProximityNotification};
pub use channel::{Channel, MpscChannel, send_envelope};
pub use registry::ConnectionRegistry;
