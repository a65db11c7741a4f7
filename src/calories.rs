//! Speed-banded MET model for calorie estimation.
//!
//! MET rises piecewise-linearly with speed across five bands
//! (walking, jogging, running, fast running, very fast). Each band
//! interpolates from the previous band's upper MET to its own, so the
//! curve is continuous and non-decreasing.
//!
//! ## Example
//! ```rust
//! use aerofit_tracker::calories::{incremental_calories, MetBands};
//!
//! let bands = MetBands::default();
//! assert_eq!(bands.met_for_speed(8.0), 8.0);
//!
//! // 1 km at 10 km/h for a 70 kg athlete
//! let kcal = incremental_calories(&bands, 10.0, 1.0, 70.0, 0.1);
//! assert!(kcal > 60.0 && kcal < 70.0);
//! ```

use serde::{Deserialize, Serialize};

/// Activity band for a given speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedBand {
    Walking,
    Jogging,
    Running,
    FastRunning,
    VeryFast,
}

/// Piecewise-linear MET curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetBands {
    /// Upper speed of each band in km/h [walking, jogging, running, fast, very fast ramp end].
    /// Speeds beyond the last breakpoint use the last MET value.
    pub speed_breakpoints: [f64; 5],
    /// MET at 0 km/h followed by the MET reached at each breakpoint.
    pub met_values: [f64; 6],
}

impl Default for MetBands {
    fn default() -> Self {
        Self {
            speed_breakpoints: [4.0, 8.0, 12.0, 16.0, 20.0],
            met_values: [2.0, 3.5, 8.0, 11.5, 14.0, 16.0],
        }
    }
}

impl MetBands {
    /// Create bands with custom breakpoints and MET anchors.
    pub fn with_values(speed_breakpoints: [f64; 5], met_values: [f64; 6]) -> Self {
        Self {
            speed_breakpoints,
            met_values,
        }
    }

    /// Check that breakpoints ascend and MET values never decrease.
    pub fn is_monotonic(&self) -> bool {
        let speeds_ok = self.speed_breakpoints[0] > 0.0
            && self.speed_breakpoints.windows(2).all(|w| w[0] < w[1]);
        let mets_ok = self.met_values[0] >= 0.0 && self.met_values.windows(2).all(|w| w[0] <= w[1]);
        speeds_ok && mets_ok
    }

    /// Band a speed falls into. The very-fast band starts at the fourth breakpoint.
    pub fn band_for_speed(&self, speed_kmh: f64) -> SpeedBand {
        let b = &self.speed_breakpoints;
        if speed_kmh < b[0] {
            SpeedBand::Walking
        } else if speed_kmh < b[1] {
            SpeedBand::Jogging
        } else if speed_kmh < b[2] {
            SpeedBand::Running
        } else if speed_kmh < b[3] {
            SpeedBand::FastRunning
        } else {
            SpeedBand::VeryFast
        }
    }

    /// MET for a speed in km/h.
    pub fn met_for_speed(&self, speed_kmh: f64) -> f64 {
        if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
            return self.met_values[0];
        }

        let mut lower_speed = 0.0;
        for (i, &upper_speed) in self.speed_breakpoints.iter().enumerate() {
            if speed_kmh <= upper_speed {
                let lower_met = self.met_values[i];
                let upper_met = self.met_values[i + 1];
                let t = (speed_kmh - lower_speed) / (upper_speed - lower_speed);
                return lower_met + t * (upper_met - lower_met);
            }
            lower_speed = upper_speed;
        }

        self.met_values[self.met_values.len() - 1]
    }
}

/// Calories for one increment of distance.
///
/// `MET × weight_kg × hours`, where hours = `distance_km / speed_kmh`.
/// Returns 0 when speed is below `min_speed_kmh`.
pub fn incremental_calories(
    bands: &MetBands,
    speed_kmh: f64,
    distance_km: f64,
    body_weight_kg: f64,
    min_speed_kmh: f64,
) -> f64 {
    if !speed_kmh.is_finite() || speed_kmh < min_speed_kmh || distance_km <= 0.0 {
        return 0.0;
    }
    let hours = distance_km / speed_kmh;
    let kcal = bands.met_for_speed(speed_kmh) * body_weight_kg * hours;
    if kcal.is_finite() && kcal > 0.0 {
        kcal
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_met_anchors() {
        let bands = MetBands::default();
        assert_eq!(bands.met_for_speed(0.0), 2.0);
        assert_eq!(bands.met_for_speed(4.0), 3.5);
        assert_eq!(bands.met_for_speed(8.0), 8.0);
        assert_eq!(bands.met_for_speed(12.0), 11.5);
        assert_eq!(bands.met_for_speed(16.0), 14.0);
        assert_eq!(bands.met_for_speed(20.0), 16.0);
        assert_eq!(bands.met_for_speed(35.0), 16.0);
    }

    #[test]
    fn test_met_interpolates_within_band() {
        let bands = MetBands::default();
        // Halfway through jogging: 3.5 → 8.0
        assert!((bands.met_for_speed(6.0) - 5.75).abs() < 1e-9);
        // Halfway through walking: 2.0 → 3.5
        assert!((bands.met_for_speed(2.0) - 2.75).abs() < 1e-9);
    }

    #[test]
    fn test_met_is_monotonic() {
        let bands = MetBands::default();
        assert!(bands.is_monotonic());
        let mut prev = 0.0;
        for i in 0..300 {
            let met = bands.met_for_speed(i as f64 * 0.1);
            assert!(met >= prev, "MET decreased at {} km/h", i as f64 * 0.1);
            prev = met;
        }
    }

    #[test]
    fn test_band_for_speed() {
        let bands = MetBands::default();
        assert_eq!(bands.band_for_speed(3.0), SpeedBand::Walking);
        assert_eq!(bands.band_for_speed(4.0), SpeedBand::Jogging);
        assert_eq!(bands.band_for_speed(10.0), SpeedBand::Running);
        assert_eq!(bands.band_for_speed(13.0), SpeedBand::FastRunning);
        assert_eq!(bands.band_for_speed(16.0), SpeedBand::VeryFast);
    }

    #[test]
    fn test_incremental_calories_guards_low_speed() {
        let bands = MetBands::default();
        assert_eq!(incremental_calories(&bands, 0.05, 0.01, 70.0, 0.1), 0.0);
        assert_eq!(incremental_calories(&bands, f64::NAN, 0.01, 70.0, 0.1), 0.0);
        assert_eq!(incremental_calories(&bands, 10.0, 0.0, 70.0, 0.1), 0.0);
    }

    #[test]
    fn test_incremental_calories_running() {
        let bands = MetBands::default();
        // 10 km/h → MET 9.75; 1 km takes 0.1 h
        let kcal = incremental_calories(&bands, 10.0, 1.0, 70.0, 0.1);
        assert!((kcal - 9.75 * 70.0 * 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_non_monotonic_bands_detected() {
        let bands = MetBands::with_values([4.0, 8.0, 12.0, 16.0, 20.0], [2.0, 9.0, 8.0, 11.5, 14.0, 16.0]);
        assert!(!bands.is_monotonic());
    }
}
