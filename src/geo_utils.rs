//! Geographic utilities: great-circle distance, grade and unit conversions.
//!
//! All functions are pure. Distances are in meters unless the name says otherwise.

use crate::Coordinate;

/// Mean Earth radius used by every distance computation in the crate.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Distances below this are reported as exactly zero by [`distance_meters`].
pub const JITTER_FLOOR_METERS: f64 = 1.0;

const MPS_TO_KMH: f64 = 3.6;

/// Raw haversine distance in meters, without any guards.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Great-circle distance between two samples.
///
/// Returns 0 when either sample is the `(0, 0)` "no fix" sentinel or has
/// non-finite coordinates, and when the distance is below
/// [`JITTER_FLOOR_METERS`] (stationary GPS noise).
///
/// # Example
/// ```
/// use aerofit_tracker::{Coordinate, geo_utils::distance_meters};
///
/// let a = Coordinate::new(0.0001, 0.0, 0);
/// let b = Coordinate::new(0.0001, 1.0, 1_000);
/// let d = distance_meters(&a, &b);
/// assert!((d - 111_195.0).abs() < 1_112.0);
/// ```
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    if !a.has_fix() || !b.has_fix() {
        return 0.0;
    }
    let d = haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude);
    if !d.is_finite() || d < JITTER_FLOOR_METERS {
        return 0.0;
    }
    d
}

/// Grade in percent: `elevation_delta / distance * 100`, 0 when distance is 0.
pub fn grade_percent(distance: f64, elevation_delta: f64) -> f64 {
    if distance <= 0.0 || !distance.is_finite() {
        return 0.0;
    }
    (elevation_delta / distance) * 100.0
}

/// Sum of segment distances along a path (same guards as [`distance_meters`]).
pub fn polyline_length(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_meters(&pair[0], &pair[1]))
        .sum()
}

/// Convert meters/second to kilometers/hour.
pub fn mps_to_kmh(mps: f64) -> f64 {
    mps * MPS_TO_KMH
}

/// Convert kilometers/hour to meters/second.
pub fn kmh_to_mps(kmh: f64) -> f64 {
    kmh / MPS_TO_KMH
}

/// Convert meters to kilometers.
pub fn meters_to_km(meters: f64) -> f64 {
    meters / 1000.0
}

/// Approximate conversion of a ground distance to degrees of latitude.
///
/// Used to express simplification tolerances in meters.
pub fn meters_to_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_METERS).to_degrees()
}

/// Elapsed seconds between two millisecond timestamps (may be zero or negative).
pub fn elapsed_seconds(from_ms: i64, to_ms: i64) -> f64 {
    (to_ms - from_ms) as f64 / 1000.0
}
