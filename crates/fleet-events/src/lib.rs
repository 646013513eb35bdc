//! # fleet-events
//!
//! The closed message taxonomy pushed over live channels, and the envelope
//! that wraps each message with a timestamp and a unique message id.
//!
//! Every payload shape is a typed struct and the set of message types is a
//! single exhaustive enum, so handlers match on variants instead of a `type`
//! string, so a missed case is a compile error.

#![deny(unsafe_code)]

pub mod envelope;
pub mod message;

pub use envelope::MessageEnvelope;
pub use message::{
    ConnectedRider, DispatchMessage, ErrorPayload, LocationUpdatePayload, NewOrderPayload,
    OrderAssignedPayload, OrderAssignmentPayload, ProximityResultsPayload,
};
