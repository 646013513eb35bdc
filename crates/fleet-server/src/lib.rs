//! # fleet-server
//!
//! Axum HTTP + `WebSocket` gateway for the dispatch subsystem.
//!
//! - HTTP endpoints: health check
//! - `WebSocket` gateways: `/ws/riders` (courier channels, identified by
//!   rider id) and `/ws/dispatch` (dashboard channels)
//! - Per-connection write task, heartbeat liveness, periodic stale sweep
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod health;
pub mod server;
pub mod shutdown;
pub mod sweep;
pub mod websocket;

pub use server::{AppState, FleetServer};
pub use shutdown::ShutdownCoordinator;
