//! # fleet-geo
//!
//! Pure distance and bounding-box functions for proximity search.
//!
//! - [`distance_km`]: great-circle distance via the haversine formula
//! - [`bounding_box`]: cheap rectangular pre-filter around a center point
//! - [`is_valid_coordinate`]: boundary validation (range + NaN rejection)
//!
//! All functions are deterministic and stateless. Distances are rounded to
//! 2 decimal places so comparisons are stable and reproducible across
//! platforms; the bounding box is an approximation and must never be used
//! as the authoritative radius test.

#![deny(unsafe_code)]

use fleet_core::{BoundingBox, Coordinate};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate kilometers per degree of latitude.
const KM_PER_DEGREE_LAT: f64 = 111.0;

/// Great-circle distance between two coordinates in kilometers, rounded to
/// 2 decimal places.
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    round2(EARTH_RADIUS_KM * c)
}

/// Rectangular pre-filter region around `center`.
///
/// Approximates 1° of latitude as 111 km and scales longitude degrees by
/// `cos(latitude)`. The box can both over- and under-include near the poles
/// and at large radii; callers must re-check with [`distance_km`].
#[must_use]
pub fn bounding_box(center: Coordinate, radius_km: f64) -> BoundingBox {
    let lat_offset = radius_km / KM_PER_DEGREE_LAT;
    let lng_offset = radius_km / (KM_PER_DEGREE_LAT * center.latitude.to_radians().cos());

    BoundingBox {
        min_lat: center.latitude - lat_offset,
        max_lat: center.latitude + lat_offset,
        min_lng: center.longitude - lng_offset,
        max_lng: center.longitude + lng_offset,
    }
}

/// Whether a coordinate is usable: finite and within latitude/longitude
/// range. Rejects NaN and infinities.
#[must_use]
pub fn is_valid_coordinate(c: Coordinate) -> bool {
    c.latitude.is_finite()
        && c.longitude.is_finite()
        && (-90.0..=90.0).contains(&c.latitude)
        && (-180.0..=180.0).contains(&c.longitude)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
