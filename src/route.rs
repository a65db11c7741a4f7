//! Append-only route of accepted samples.
//!
//! The route is backed by an `Arc<Vec<_>>`: snapshots share the buffer and the
//! next append copies it only while a snapshot is still alive (copy-on-write).
//! Indices are stable and the route never shrinks during a session.

use std::sync::Arc;

use geo::{Coord, LineString, SimplifyIdx};
use serde::{Serialize, Serializer};

use crate::geo_utils::{meters_to_degrees, polyline_length};
use crate::{Bounds, Coordinate};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    points: Arc<Vec<Coordinate>>,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an accepted sample.
    pub(crate) fn push(&mut self, sample: Coordinate) {
        Arc::make_mut(&mut self.points).push(sample);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn last(&self) -> Option<&Coordinate> {
        self.points.last()
    }

    /// The last `n` samples (fewer if the route is shorter).
    pub fn tail(&self, n: usize) -> &[Coordinate] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    /// Bounding box of the route, for fitting the map viewport.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }

    /// Length along the route in meters.
    pub fn path_length(&self) -> f64 {
        polyline_length(&self.points)
    }

    /// Douglas-Peucker simplification for drawing the route overlay.
    ///
    /// Keeps original samples (with their altitude and timestamps); the
    /// first and last samples are always retained.
    pub fn simplified(&self, tolerance_meters: f64) -> Vec<Coordinate> {
        if self.points.len() < 3 {
            return self.points.to_vec();
        }

        let line: LineString<f64> = self
            .points
            .iter()
            .map(|p| Coord {
                x: p.longitude,
                y: p.latitude,
            })
            .collect();

        line.simplify_idx(&meters_to_degrees(tolerance_meters))
            .into_iter()
            .map(|idx| self.points[idx].clone())
            .collect()
    }
}

impl Serialize for Route {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.points.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(n: usize) -> Route {
        let mut route = Route::new();
        for i in 0..n {
            route.push(Coordinate::new(51.5 + i as f64 * 0.0002, -0.12, i as i64 * 1000));
        }
        route
    }

    #[test]
    fn test_push_and_tail() {
        let route = straight(7);
        assert_eq!(route.len(), 7);
        assert_eq!(route.tail(3).len(), 3);
        assert_eq!(route.tail(3)[2].timestamp, 6000);
        assert_eq!(route.tail(10).len(), 7);
    }

    #[test]
    fn test_copy_on_write_keeps_snapshots_stable() {
        let mut route = straight(3);
        let snapshot = route.clone();
        route.push(Coordinate::new(51.51, -0.12, 9000));
        assert_eq!(snapshot.len(), 3);
        assert_eq!(route.len(), 4);
    }

    #[test]
    fn test_simplified_straight_line() {
        let route = straight(20);
        let simplified = route.simplified(2.0);
        assert_eq!(simplified.len(), 2);
        assert_eq!(simplified[0].timestamp, 0);
        assert_eq!(simplified[1].timestamp, 19_000);
    }

    #[test]
    fn test_simplified_keeps_corner() {
        let mut route = straight(5);
        let corner = route.last().cloned().unwrap();
        for i in 1..5 {
            route.push(Coordinate::new(
                corner.latitude,
                corner.longitude + i as f64 * 0.0003,
                corner.timestamp + i * 1000,
            ));
        }
        let simplified = route.simplified(2.0);
        assert_eq!(simplified.len(), 3);
        assert_eq!(simplified[1].timestamp, corner.timestamp);
    }

    #[test]
    fn test_bounds_and_length() {
        let route = straight(3);
        let bounds = route.bounds().unwrap();
        assert!((bounds.max_lat - 51.5004).abs() < 1e-9);
        assert!((route.path_length() - 44.5).abs() < 0.5);
        assert!(Route::new().bounds().is_none());
    }

    #[test]
    fn test_serializes_as_array() {
        let json = serde_json::to_value(straight(2)).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 2);
    }
}
