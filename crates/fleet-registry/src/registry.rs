//! Authoritative map from subject id to live channel.
//!
//! Concurrency discipline: mutations take the write lock, reads the read
//! lock, and every channel send happens after the lock is released, against
//! a snapshot captured under the lock. Evict-then-insert for one courier id
//! happens under a single write-lock hold, so no "ghost" duplicate entry is
//! ever observable.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use fleet_core::{ConnectionStats, CourierId, DashboardSessionId};
use fleet_events::envelope::MessageEnvelope;
use fleet_events::message::{ConnectedRider, ConnectedRidersPayload, DispatchMessage};

use crate::channel::{Channel, send_envelope};

/// One live connection.
struct ConnectionEntry {
    /// Non-owning handle to the transport connection.
    channel: Arc<dyn Channel>,
    /// When the channel was registered.
    connected_at: DateTime<Utc>,
    /// Last observed activity on the channel.
    last_activity: DateTime<Utc>,
}

impl ConnectionEntry {
    fn new(channel: Arc<dyn Channel>) -> Self {
        let now = Utc::now();
        Self {
            channel,
            connected_at: now,
            last_activity: now,
        }
    }
}

/// Concurrent-safe directory of live courier and dashboard channels.
///
/// Exactly one entry exists per courier id at a time; registering a second
/// channel for the same id evicts the previous one, emitting a disconnect
/// event to dashboards before the connect event.
#[derive(Default)]
pub struct ConnectionRegistry {
    couriers: RwLock<HashMap<CourierId, ConnectionEntry>>,
    dashboards: RwLock<HashMap<DashboardSessionId, ConnectionEntry>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a courier channel, evicting any previous entry for the id.
    ///
    /// Dashboards are informed synchronously, in order: a disconnect event
    /// for the evicted entry (if any), then a connect event for the new one.
    pub fn register_courier(&self, id: CourierId, channel: Arc<dyn Channel>) {
        let (evicted, active) = {
            let mut couriers = self.couriers.write();
            let evicted = couriers.insert(id, ConnectionEntry::new(channel));
            (evicted.is_some(), couriers.len())
        };

        if evicted {
            let _ = self.notify_dashboards(DispatchMessage::rider_disconnected(id));
        }
        info!(rider_id = %id, active, "rider connected");
        let _ = self.notify_dashboards(DispatchMessage::rider_connected(id));
    }

    /// Register a dashboard channel and push the current courier-connection
    /// snapshot to it.
    pub fn register_dashboard(&self, id: DashboardSessionId, channel: Arc<dyn Channel>) {
        let active = {
            let mut dashboards = self.dashboards.write();
            let _ = dashboards.insert(id.clone(), ConnectionEntry::new(channel.clone()));
            dashboards.len()
        };
        info!(session_id = %id, active, "dispatch dashboard connected");

        let snapshot = DispatchMessage::ConnectedRidersList(ConnectedRidersPayload {
            riders: self.connected_riders_snapshot(),
        });
        let _ = send_envelope(channel.as_ref(), &snapshot);
    }

    /// Remove a courier entry. Returns whether anything was removed; emits a
    /// disconnect event to dashboards when it was.
    pub fn unregister_courier(&self, id: CourierId) -> bool {
        let (removed, active) = {
            let mut couriers = self.couriers.write();
            let removed = couriers.remove(&id).is_some();
            (removed, couriers.len())
        };
        if removed {
            info!(rider_id = %id, active, "rider disconnected");
            let _ = self.notify_dashboards(DispatchMessage::rider_disconnected(id));
        }
        removed
    }

    /// Remove the courier entry only if it still holds `channel`.
    ///
    /// Connection cleanup must use this form: a connection that was evicted
    /// by a newer registration for the same id would otherwise tear down its
    /// replacement.
    pub fn unregister_courier_channel(&self, id: CourierId, channel: &Arc<dyn Channel>) -> bool {
        let removed = {
            let mut couriers = self.couriers.write();
            if couriers
                .get(&id)
                .is_some_and(|entry| Arc::ptr_eq(&entry.channel, channel))
            {
                couriers.remove(&id).is_some()
            } else {
                false
            }
        };
        if removed {
            info!(rider_id = %id, "rider disconnected");
            let _ = self.notify_dashboards(DispatchMessage::rider_disconnected(id));
        }
        removed
    }

    /// Remove a dashboard entry. Returns whether anything was removed.
    pub fn unregister_dashboard(&self, id: &DashboardSessionId) -> bool {
        let removed = self.dashboards.write().remove(id).is_some();
        if removed {
            info!(session_id = %id, "dispatch dashboard disconnected");
        }
        removed
    }

    /// Whether the courier has a live, open channel.
    #[must_use]
    pub fn is_courier_connected(&self, id: CourierId) -> bool {
        self.couriers
            .read()
            .get(&id)
            .is_some_and(|entry| entry.channel.is_open())
    }

    /// Ids of currently connected couriers, ascending.
    ///
    /// Point-in-time snapshot; re-query for freshness after any await.
    #[must_use]
    pub fn connected_courier_ids(&self) -> Vec<CourierId> {
        let mut ids: Vec<CourierId> = self.couriers.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The channel for one courier, if registered.
    #[must_use]
    pub fn courier_channel(&self, id: CourierId) -> Option<Arc<dyn Channel>> {
        self.couriers.read().get(&id).map(|e| e.channel.clone())
    }

    /// Refresh a courier's last-activity timestamp.
    pub fn touch_courier(&self, id: CourierId) {
        if let Some(entry) = self.couriers.write().get_mut(&id) {
            entry.last_activity = Utc::now();
        }
    }

    /// Refresh a dashboard's last-activity timestamp.
    pub fn touch_dashboard(&self, id: &DashboardSessionId) {
        if let Some(entry) = self.dashboards.write().get_mut(id) {
            entry.last_activity = Utc::now();
        }
    }

    /// Live connection counters.
    #[must_use]
    pub fn stats(&self) -> ConnectionStats {
        let riders = self.couriers.read().len();
        let dispatchers = self.dashboards.read().len();
        ConnectionStats {
            connected_riders: riders,
            connected_dispatchers: dispatchers,
            total_connections: riders + dispatchers,
        }
    }

    /// Snapshot of connected couriers for the dashboard welcome push,
    /// ascending by id.
    #[must_use]
    pub fn connected_riders_snapshot(&self) -> Vec<ConnectedRider> {
        let mut riders: Vec<ConnectedRider> = self
            .couriers
            .read()
            .iter()
            .map(|(id, entry)| ConnectedRider {
                rider_id: *id,
                connected_at: entry.connected_at.to_rfc3339(),
                last_activity: entry.last_activity.to_rfc3339(),
            })
            .collect();
        riders.sort_unstable_by_key(|r| r.rider_id);
        riders
    }

    /// Send one message to every dashboard channel; returns the delivered
    /// count.
    ///
    /// Channels found closed during iteration are removed as a side effect.
    /// Zero connected dashboards is expected, not exceptional.
    pub fn notify_dashboards(&self, message: DispatchMessage) -> usize {
        let message_type = message.message_type();
        let envelope = MessageEnvelope::new(message);
        let json = match envelope.to_json() {
            Ok(json) => Arc::new(json),
            Err(e) => {
                warn!(message_type, error = %e, "failed to serialize dashboard broadcast");
                return 0;
            }
        };

        let targets: Vec<(DashboardSessionId, Arc<dyn Channel>)> = self
            .dashboards
            .read()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.channel.clone()))
            .collect();

        if targets.is_empty() {
            warn!(message_type, "no dispatch connections available to receive message");
            return 0;
        }

        let mut delivered = 0;
        let mut closed: Vec<DashboardSessionId> = Vec::new();
        for (id, channel) in targets {
            if !channel.is_open() {
                closed.push(id);
                continue;
            }
            if channel.send(json.clone()) {
                delivered += 1;
            } else {
                warn!(session_id = %id, message_type, "failed to send to dashboard");
            }
        }

        if !closed.is_empty() {
            let mut dashboards = self.dashboards.write();
            for id in &closed {
                let _ = dashboards.remove(id);
            }
            debug!(cleaned = closed.len(), "removed closed dashboard channels during broadcast");
        }

        debug!(message_type, delivered, "broadcast to dispatch dashboards");
        delivered
    }

    /// Remove every entry whose channel reports closed. Returns how many
    /// were removed. Intended to run on a periodic timer; idempotent.
    pub fn sweep_stale(&self) -> usize {
        let stale_couriers: Vec<CourierId> = {
            let couriers = self.couriers.read();
            couriers
                .iter()
                .filter(|(_, entry)| !entry.channel.is_open())
                .map(|(id, _)| *id)
                .collect()
        };
        let stale_dashboards: Vec<DashboardSessionId> = {
            let dashboards = self.dashboards.read();
            dashboards
                .iter()
                .filter(|(_, entry)| !entry.channel.is_open())
                .map(|(id, _)| id.clone())
                .collect()
        };

        let mut removed_couriers: Vec<CourierId> = Vec::new();
        {
            let mut couriers = self.couriers.write();
            for id in stale_couriers {
                // Re-check under the write lock: the entry may have been
                // replaced by a fresh registration since the scan.
                if couriers.get(&id).is_some_and(|e| !e.channel.is_open())
                    && couriers.remove(&id).is_some()
                {
                    removed_couriers.push(id);
                }
            }
        }
        let mut removed = removed_couriers.len();
        {
            let mut dashboards = self.dashboards.write();
            for id in &stale_dashboards {
                if dashboards.get(id).is_some_and(|e| !e.channel.is_open())
                    && dashboards.remove(id).is_some()
                {
                    removed += 1;
                }
            }
        }

        for id in removed_couriers {
            let _ = self.notify_dashboards(DispatchMessage::rider_disconnected(id));
        }

        if removed > 0 {
            info!(removed, "swept stale connections");
        }
        removed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingChannel;

    #[test]
    fn register_then_query() {
        let registry = ConnectionRegistry::new();
        registry.register_courier(CourierId::new(1), RecordingChannel::new());
        assert!(registry.is_courier_connected(CourierId::new(1)));
        assert_eq!(registry.connected_courier_ids(), vec![CourierId::new(1)]);
    }

    #[test]
    fn reregister_leaves_single_entry_and_emits_disconnect_then_connect() {
        let registry = ConnectionRegistry::new();
        let dashboard = RecordingChannel::new();
        registry.register_dashboard(DashboardSessionId::from("d1"), dashboard.clone());

        registry.register_courier(CourierId::new(1), RecordingChannel::new());
        registry.register_courier(CourierId::new(1), RecordingChannel::new());

        assert_eq!(registry.connected_courier_ids(), vec![CourierId::new(1)]);
        assert_eq!(
            dashboard.received_types(),
            vec![
                "connected_riders_list",
                "rider_connected",
                "rider_disconnected",
                "rider_connected",
            ]
        );
    }

    #[test]
    fn unregister_removes_and_notifies() {
        let registry = ConnectionRegistry::new();
        let dashboard = RecordingChannel::new();
        registry.register_dashboard(DashboardSessionId::from("d1"), dashboard.clone());
        registry.register_courier(CourierId::new(4), RecordingChannel::new());

        assert!(registry.unregister_courier(CourierId::new(4)));
        assert!(!registry.is_courier_connected(CourierId::new(4)));
        assert_eq!(
            dashboard.received_types().last().map(String::as_str),
            Some("rider_disconnected")
        );
    }

    #[test]
    fn evicted_connection_cleanup_keeps_replacement() {
        let registry = ConnectionRegistry::new();
        let first: Arc<dyn Channel> = RecordingChannel::new();
        let second: Arc<dyn Channel> = RecordingChannel::new();
        registry.register_courier(CourierId::new(1), first.clone());
        registry.register_courier(CourierId::new(1), second.clone());

        // The evicted connection's cleanup must be a no-op.
        assert!(!registry.unregister_courier_channel(CourierId::new(1), &first));
        assert!(registry.is_courier_connected(CourierId::new(1)));

        // The live connection's cleanup removes the entry.
        assert!(registry.unregister_courier_channel(CourierId::new(1), &second));
        assert!(!registry.is_courier_connected(CourierId::new(1)));
    }

    #[test]
    fn unregister_missing_returns_false() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.unregister_courier(CourierId::new(99)));
        assert!(!registry.unregister_dashboard(&DashboardSessionId::from("nope")));
    }

    #[test]
    fn dashboard_gets_snapshot_on_register() {
        let registry = ConnectionRegistry::new();
        registry.register_courier(CourierId::new(2), RecordingChannel::new());
        registry.register_courier(CourierId::new(1), RecordingChannel::new());

        let dashboard = RecordingChannel::new();
        registry.register_dashboard(DashboardSessionId::from("d1"), dashboard.clone());

        let received = dashboard.received_json();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["type"], "connected_riders_list");
        let riders = received[0]["data"]["riders"].as_array().unwrap();
        assert_eq!(riders.len(), 2);
        // Snapshot is sorted ascending by id.
        assert_eq!(riders[0]["riderId"], 1);
        assert_eq!(riders[1]["riderId"], 2);
    }

    #[test]
    fn connected_ids_are_sorted() {
        let registry = ConnectionRegistry::new();
        for id in [5, 1, 3] {
            registry.register_courier(CourierId::new(id), RecordingChannel::new());
        }
        assert_eq!(
            registry.connected_courier_ids(),
            vec![CourierId::new(1), CourierId::new(3), CourierId::new(5)]
        );
    }

    #[test]
    fn closed_channel_not_reported_connected() {
        let registry = ConnectionRegistry::new();
        let channel = RecordingChannel::new();
        registry.register_courier(CourierId::new(1), channel.clone());
        assert!(registry.is_courier_connected(CourierId::new(1)));
        channel.close();
        assert!(!registry.is_courier_connected(CourierId::new(1)));
    }

    #[test]
    fn stats_count_both_roles() {
        let registry = ConnectionRegistry::new();
        registry.register_courier(CourierId::new(1), RecordingChannel::new());
        registry.register_courier(CourierId::new(2), RecordingChannel::new());
        registry.register_dashboard(DashboardSessionId::from("d1"), RecordingChannel::new());

        let stats = registry.stats();
        assert_eq!(stats.connected_riders, 2);
        assert_eq!(stats.connected_dispatchers, 1);
        assert_eq!(stats.total_connections, 3);
    }

    #[test]
    fn broadcast_with_no_dashboards_delivers_zero() {
        let registry = ConnectionRegistry::new();
        let delivered = registry.notify_dashboards(DispatchMessage::error("X", "y"));
        assert_eq!(delivered, 0);
    }

    #[test]
    fn broadcast_skips_and_removes_closed_dashboards() {
        let registry = ConnectionRegistry::new();
        let live = RecordingChannel::new();
        let dead = RecordingChannel::new();
        registry.register_dashboard(DashboardSessionId::from("live"), live.clone());
        registry.register_dashboard(DashboardSessionId::from("dead"), dead.clone());
        dead.close();

        let delivered = registry.notify_dashboards(DispatchMessage::error("X", "y"));
        assert_eq!(delivered, 1);
        // The closed channel was lazily removed.
        assert_eq!(registry.stats().connected_dispatchers, 1);
    }

    #[test]
    fn sweep_removes_closed_entries() {
        let registry = ConnectionRegistry::new();
        let open_chan = RecordingChannel::new();
        let closed_chan = RecordingChannel::new();
        registry.register_courier(CourierId::new(1), open_chan);
        registry.register_courier(CourierId::new(2), closed_chan.clone());
        closed_chan.close();

        assert_eq!(registry.sweep_stale(), 1);
        assert_eq!(registry.connected_courier_ids(), vec![CourierId::new(1)]);
        // Idempotent: nothing left to remove.
        assert_eq!(registry.sweep_stale(), 0);
    }

    #[test]
    fn sweep_notifies_dashboards_of_removed_couriers() {
        let registry = ConnectionRegistry::new();
        let dashboard = RecordingChannel::new();
        registry.register_dashboard(DashboardSessionId::from("d1"), dashboard.clone());
        let courier = RecordingChannel::new();
        registry.register_courier(CourierId::new(7), courier.clone());
        courier.close();

        let _ = registry.sweep_stale();
        assert_eq!(
            dashboard.received_types().last().map(String::as_str),
            Some("rider_disconnected")
        );
    }

    #[test]
    fn sweep_removes_closed_dashboards_too() {
        let registry = ConnectionRegistry::new();
        let dashboard = RecordingChannel::new();
        registry.register_dashboard(DashboardSessionId::from("d1"), dashboard.clone());
        dashboard.close();
        assert_eq!(registry.sweep_stale(), 1);
        assert_eq!(registry.stats().connected_dispatchers, 0);
    }

    #[test]
    fn presence_events_carry_rider_id() {
        let registry = ConnectionRegistry::new();
        let dashboard = RecordingChannel::new();
        registry.register_dashboard(DashboardSessionId::from("d1"), dashboard.clone());
        registry.register_courier(CourierId::new(12), RecordingChannel::new());

        let received = dashboard.received_json();
        let connect = received.last().unwrap();
        assert_eq!(connect["type"], "rider_connected");
        assert_eq!(connect["data"]["riderId"], 12);
        assert!(connect.get("messageId").is_some());
    }
}
