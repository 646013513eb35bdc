//! WebSocket gateways: connection lifecycle, heartbeat, and inbound message
//! handling for couriers and dispatch dashboards.

pub mod dispatch;
pub mod handler;
pub mod heartbeat;
pub mod rider;

pub use dispatch::dispatch_ws_handler;
pub use rider::rider_ws_handler;
