//! Settings types for the gateway and dispatch layers.

use fleet_core::ReassignPolicy;
use serde::{Deserialize, Serialize};

/// Top-level settings document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FleetSettings {
    /// WebSocket gateway network and runtime settings.
    pub gateway: GatewaySettings,
    /// Proximity search and assignment tuning.
    pub dispatch: DispatchSettings,
}

/// Gateway network and runtime settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Per-connection outbound queue depth.
    pub channel_buffer: usize,
    /// Heartbeat ping interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Close the connection after this long without a pong.
    pub heartbeat_timeout_ms: u64,
    /// Interval for the stale-connection sweep in milliseconds.
    pub sweep_interval_ms: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 500,
            channel_buffer: 64,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            sweep_interval_ms: 60_000,
            max_message_size: 64 * 1024,
        }
    }
}

/// Proximity search and assignment tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchSettings {
    /// Default search radius when the caller does not specify one.
    pub default_search_radius_km: f64,
    /// Policy for orders already assigned to a different courier.
    pub reassign_policy: ReassignPolicy,
    /// Deadline for external-store round-trips in milliseconds.
    pub store_timeout_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            default_search_radius_km: 5.0,
            reassign_policy: ReassignPolicy::LastWriterWins,
            store_timeout_ms: 2_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
