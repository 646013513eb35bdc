//! `/health` endpoint.

use std::time::Instant;

use fleet_core::ConnectionStats;
use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Live connection counters.
    pub connections: ConnectionStats,
}

/// Build a health response from live counters.
#[must_use]
pub fn health_check(start_time: Instant, connections: ConnectionStats) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), ConnectionStats::default());
        assert_eq!(resp.status, "ok");
    }

    #[test]
    fn uptime_starts_at_zero() {
        let resp = health_check(Instant::now(), ConnectionStats::default());
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        let resp = health_check(start, ConnectionStats::default());
        assert!(resp.uptime_secs >= 59);
    }

    #[test]
    fn serialization() {
        let stats = ConnectionStats {
            connected_riders: 2,
            connected_dispatchers: 1,
            total_connections: 3,
        };
        let resp = health_check(Instant::now(), stats);
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"]["connectedRiders"], 2);
        assert_eq!(parsed["connections"]["totalConnections"], 3);
        assert!(parsed["uptime_secs"].is_number());
    }
}
