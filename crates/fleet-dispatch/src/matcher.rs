//! Proximity search: which couriers are eligible for a new order.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use fleet_core::{
    CandidateCourier, Coordinate, CourierLocationStore, DispatchError, Result,
};
use fleet_geo::{bounding_box, distance_km, is_valid_coordinate};
use fleet_registry::ConnectionRegistry;

/// Finds couriers near an order origin, ranked by distance.
pub struct ProximityMatcher {
    locations: Arc<dyn CourierLocationStore>,
    registry: Arc<ConnectionRegistry>,
}

impl ProximityMatcher {
    /// Create a matcher over a location store and the live-connection
    /// registry.
    #[must_use]
    pub fn new(locations: Arc<dyn CourierLocationStore>, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            locations,
            registry,
        }
    }

    /// Couriers within `radius_km` of `origin`, closest first, ties broken
    /// by ascending courier id.
    ///
    /// The bounding box bounds the store query; every returned record is
    /// re-checked against the exact rounded distance, because the box
    /// over-approximates near the poles and at large radii. An empty result
    /// is not an error.
    #[instrument(skip(self))]
    pub async fn find_nearby(
        &self,
        origin: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<CandidateCourier>> {
        if !is_valid_coordinate(origin) {
            return Err(DispatchError::InvalidInput(format!(
                "origin coordinate ({}, {}) out of range",
                origin.latitude, origin.longitude
            )));
        }
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(DispatchError::InvalidInput(format!(
                "search radius must be a positive number of kilometers, got {radius_km}"
            )));
        }

        let bbox = bounding_box(origin, radius_km);
        let records = self.locations.find_available_in_bounding_box(&bbox).await?;
        debug!(in_box = records.len(), "bounding-box pre-filter complete");

        let mut candidates: Vec<CandidateCourier> = records
            .into_iter()
            .filter_map(|record| {
                let distance = distance_km(origin, record.location);
                if distance > radius_km {
                    return None;
                }
                Some(CandidateCourier {
                    connected: self.registry.is_courier_connected(record.id),
                    id: record.id,
                    name: record.name,
                    location: record.location,
                    distance_km: distance,
                })
            })
            .collect();

        candidates.sort_unstable_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.id.cmp(&b.id))
        });

        info!(
            radius_km,
            found = candidates.len(),
            connected = candidates.iter().filter(|c| c.connected).count(),
            "proximity search complete"
        );
        Ok(candidates)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use fleet_core::{BoundingBox, CourierId, CourierRecord, CourierStatus};
    use fleet_registry::Channel;
    use mockall::mock;
    use std::sync::atomic::{AtomicBool, Ordering};

    mock! {
        LocationStore {}

        #[async_trait]
        impl CourierLocationStore for LocationStore {
            async fn find_available_in_bounding_box(
                &self,
                bbox: &BoundingBox,
            ) -> Result<Vec<CourierRecord>>;

            async fn courier_status(&self, id: CourierId) -> Result<Option<CourierStatus>>;
        }
    }

    struct StubChannel {
        open: AtomicBool,
    }

    impl StubChannel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                open: AtomicBool::new(true),
            })
        }
    }

    impl Channel for StubChannel {
        fn send(&self, _message: Arc<String>) -> bool {
            self.is_open()
        }

        fn is_open(&self) -> bool {
            self.open.load(Ordering::Relaxed)
        }
    }

    fn record(id: i64, lat: f64, lng: f64) -> CourierRecord {
        CourierRecord {
            id: CourierId::new(id),
            name: format!("rider-{id}"),
            phone: "+2348000000000".into(),
            location: Coordinate::new(lat, lng),
            last_update: Utc::now(),
        }
    }

    fn matcher_with(records: Vec<CourierRecord>) -> (ProximityMatcher, Arc<ConnectionRegistry>) {
        let mut store = MockLocationStore::new();
        let _ = store
            .expect_find_available_in_bounding_box()
            .returning(move |_| Ok(records.clone()));
        let registry = Arc::new(ConnectionRegistry::new());
        (
            ProximityMatcher::new(Arc::new(store), registry.clone()),
            registry,
        )
    }

    const ORIGIN: Coordinate = Coordinate::new(6.453236, 3.542878);

    #[tokio::test]
    async fn invalid_origin_fails_before_store_query() {
        let mut store = MockLocationStore::new();
        let _ = store.expect_find_available_in_bounding_box().never();
        let matcher = ProximityMatcher::new(Arc::new(store), Arc::new(ConnectionRegistry::new()));

        let err = matcher
            .find_nearby(Coordinate::new(91.0, 0.0), 5.0)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn non_positive_radius_is_rejected() {
        let mut store = MockLocationStore::new();
        let _ = store.expect_find_available_in_bounding_box().never();
        let matcher = ProximityMatcher::new(Arc::new(store), Arc::new(ConnectionRegistry::new()));

        for radius in [0.0, -1.0, f64::NAN] {
            let err = matcher.find_nearby(ORIGIN, radius).await.unwrap_err();
            assert_eq!(err.code(), "INVALID_INPUT");
        }
    }

    #[tokio::test]
    async fn courier_at_origin_has_zero_distance() {
        let (matcher, _registry) = matcher_with(vec![record(1, 6.453236, 3.542878)]);
        let candidates = matcher.find_nearby(ORIGIN, 5.0).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].distance_km.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn courier_within_radius_is_included() {
        // ~4.5 km from the origin.
        let near = record(2, 6.42, 3.52);
        let d = distance_km(ORIGIN, near.location);
        assert!(d > 4.0 && d < 5.0, "fixture should sit inside the radius, got {d}");

        let (matcher, _registry) = matcher_with(vec![near]);
        let candidates = matcher.find_nearby(ORIGIN, 5.0).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].distance_km <= 5.0);
    }

    #[tokio::test]
    async fn courier_beyond_radius_is_excluded() {
        // ~8 km away; the store may still return it from the box query.
        let far = record(3, 6.380236, 3.475878);
        assert!(distance_km(ORIGIN, far.location) > 5.0);

        let (matcher, _registry) = matcher_with(vec![far]);
        let candidates = matcher.find_nearby(ORIGIN, 5.0).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn every_candidate_satisfies_the_radius() {
        let records = vec![
            record(1, 6.453236, 3.542878),
            record(2, 6.42, 3.52),
            record(3, 6.380236, 3.475878),
            record(4, 6.46, 3.55),
        ];
        let (matcher, _registry) = matcher_with(records);
        let candidates = matcher.find_nearby(ORIGIN, 5.0).await.unwrap();
        assert!(!candidates.is_empty());
        for candidate in &candidates {
            assert!(
                candidate.distance_km <= 5.0,
                "{} at {} km breaks the radius invariant",
                candidate.id,
                candidate.distance_km
            );
        }
    }

    #[tokio::test]
    async fn candidates_sorted_by_distance_then_id() {
        let records = vec![
            record(5, 6.42, 3.52),
            record(1, 6.46, 3.55),
            // Same point as rider 5 → same rounded distance, lower id wins.
            record(2, 6.42, 3.52),
        ];
        let (matcher, _registry) = matcher_with(records);
        let candidates = matcher.find_nearby(ORIGIN, 10.0).await.unwrap();

        let distances: Vec<f64> = candidates.iter().map(|c| c.distance_km).collect();
        let mut sorted = distances.clone();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(distances, sorted);

        let tied: Vec<CourierId> = candidates
            .iter()
            .filter(|c| (c.distance_km - candidates.last().unwrap().distance_km).abs() < f64::EPSILON)
            .map(|c| c.id)
            .collect();
        assert_eq!(tied, vec![CourierId::new(2), CourierId::new(5)]);
    }

    #[tokio::test]
    async fn connected_flag_reflects_registry() {
        let records = vec![record(1, 6.453236, 3.542878), record(2, 6.42, 3.52)];
        let (matcher, registry) = matcher_with(records);
        registry.register_courier(CourierId::new(1), StubChannel::new());

        let candidates = matcher.find_nearby(ORIGIN, 5.0).await.unwrap();
        let by_id =
            |id: i64| candidates.iter().find(|c| c.id == CourierId::new(id)).unwrap();
        assert!(by_id(1).connected);
        assert!(!by_id(2).connected);
    }

    #[tokio::test]
    async fn empty_result_is_ok_not_error() {
        let (matcher, _registry) = matcher_with(vec![]);
        let candidates = matcher.find_nearby(ORIGIN, 5.0).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn store_error_propagates() {
        let mut store = MockLocationStore::new();
        let _ = store
            .expect_find_available_in_bounding_box()
            .returning(|_| Err(DispatchError::StoreUnavailable("connection refused".into())));
        let matcher = ProximityMatcher::new(Arc::new(store), Arc::new(ConnectionRegistry::new()));

        let err = matcher.find_nearby(ORIGIN, 5.0).await.unwrap_err();
        assert_eq!(err.code(), "STORE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn query_box_covers_the_radius() {
        let mut store = MockLocationStore::new();
        let _ = store
            .expect_find_available_in_bounding_box()
            .withf(|bbox: &BoundingBox| {
                bbox.contains(ORIGIN)
                    && bbox.max_lat - ORIGIN.latitude >= 5.0 / 111.0 - 1e-9
            })
            .returning(|_| Ok(vec![]));
        let matcher = ProximityMatcher::new(Arc::new(store), Arc::new(ConnectionRegistry::new()));
        let _ = matcher.find_nearby(ORIGIN, 5.0).await.unwrap();
    }
}
