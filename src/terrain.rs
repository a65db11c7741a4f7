//! Terrain classification from the trailing window of accepted samples.

use serde::{Deserialize, Serialize};

use crate::geo_utils::{distance_meters, grade_percent};
use crate::{Coordinate, TerrainType};

/// Window and grade thresholds for terrain classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TerrainConfig {
    /// Most recent samples considered. Default: 5
    pub window_size: u32,
    /// Fewer samples than this keeps the previous label. Default: 3
    pub min_window_size: u32,
    /// Grade above this (percent) is uphill. Default: 3.0
    pub uphill_grade_percent: f64,
    /// Grade below this (percent) is downhill. Default: -3.0
    pub downhill_grade_percent: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            min_window_size: 3,
            uphill_grade_percent: 3.0,
            downhill_grade_percent: -3.0,
        }
    }
}

/// Grade in percent across a window: Σelevation / Σdistance × 100.
///
/// Pairs where either sample lacks altitude contribute no elevation.
pub fn window_grade(window: &[Coordinate]) -> f64 {
    let (distance, elevation) = window.windows(2).fold((0.0, 0.0), |(d, e), pair| {
        let segment = distance_meters(&pair[0], &pair[1]);
        let delta = match (pair[0].finite_altitude(), pair[1].finite_altitude()) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        };
        (d + segment, e + delta)
    });
    grade_percent(distance, elevation)
}

/// Stateless classifier over the tail of a route.
#[derive(Debug, Clone, Default)]
pub struct TerrainClassifier {
    config: TerrainConfig,
}

impl TerrainClassifier {
    pub fn new(config: TerrainConfig) -> Self {
        Self { config }
    }

    /// Classify from the tail of `route`, or return `previous` when the
    /// route holds fewer than `min_window_size` samples.
    pub fn classify(&self, route: &[Coordinate], previous: TerrainType) -> TerrainType {
        let window_len = (self.config.window_size as usize).min(route.len());
        if window_len < self.config.min_window_size as usize {
            return previous;
        }
        let window = &route[route.len() - window_len..];
        self.classify_grade(window_grade(window))
    }

    /// Map a grade to a label using the configured thresholds.
    pub fn classify_grade(&self, grade: f64) -> TerrainType {
        if grade > self.config.uphill_grade_percent {
            TerrainType::Uphill
        } else if grade < self.config.downhill_grade_percent {
            TerrainType::Downhill
        } else {
            TerrainType::Flat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Five samples due north spanning `total_distance` meters with a
    /// linear altitude change of `total_elevation`.
    fn window(total_distance: f64, total_elevation: f64) -> Vec<Coordinate> {
        let step_deg = crate::geo_utils::meters_to_degrees(total_distance / 4.0);
        (0..5)
            .map(|i| {
                Coordinate::new(45.0 + i as f64 * step_deg, 7.0, i as i64 * 5_000)
                    .with_altitude(200.0 + total_elevation * i as f64 / 4.0)
            })
            .collect()
    }

    #[test]
    fn test_uphill() {
        let classifier = TerrainClassifier::default();
        let route = window(100.0, 5.0);
        assert!((window_grade(&route) - 5.0).abs() < 0.05);
        assert_eq!(classifier.classify(&route, TerrainType::Flat), TerrainType::Uphill);
    }

    #[test]
    fn test_downhill() {
        let classifier = TerrainClassifier::default();
        let route = window(100.0, -5.0);
        assert_eq!(classifier.classify(&route, TerrainType::Flat), TerrainType::Downhill);
    }

    #[test]
    fn test_flat() {
        let classifier = TerrainClassifier::default();
        let route = window(100.0, 1.0);
        assert_eq!(classifier.classify(&route, TerrainType::Uphill), TerrainType::Flat);
    }

    #[test]
    fn test_short_window_keeps_previous() {
        let classifier = TerrainClassifier::default();
        let route = window(100.0, 10.0);
        assert_eq!(
            classifier.classify(&route[..2], TerrainType::Downhill),
            TerrainType::Downhill
        );
        assert_eq!(classifier.classify(&[], TerrainType::Uphill), TerrainType::Uphill);
    }

    #[test]
    fn test_uses_only_trailing_window() {
        let classifier = TerrainClassifier::default();
        // Steep climb followed by five flat samples
        let mut route = window(100.0, 30.0);
        let last = route.last().cloned().unwrap();
        for i in 1..=5 {
            route.push(
                Coordinate::new(last.latitude + i as f64 * 0.0002, 7.0, last.timestamp + i * 5_000)
                    .with_altitude(230.0),
            );
        }
        assert_eq!(classifier.classify(&route, TerrainType::Uphill), TerrainType::Flat);
    }

    #[test]
    fn test_zero_distance_is_flat() {
        let classifier = TerrainClassifier::default();
        let still: Vec<Coordinate> = (0..4)
            .map(|i| Coordinate::new(45.0, 7.0, i * 1000).with_altitude(200.0 + i as f64))
            .collect();
        assert_eq!(window_grade(&still), 0.0);
        assert_eq!(classifier.classify(&still, TerrainType::Uphill), TerrainType::Flat);
    }

    #[test]
    fn test_missing_altitude_contributes_nothing() {
        let route: Vec<Coordinate> = (0..3)
            .map(|i| Coordinate::new(45.0 + i as f64 * 0.0002, 7.0, i * 1000))
            .collect();
        assert_eq!(window_grade(&route), 0.0);
    }
}
