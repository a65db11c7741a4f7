//! Running workout metrics.
//!
//! [`MetricsAccumulator`] is value-in/value-out: the previous snapshot plus the
//! tail of the route (ending with the newly accepted sample) produce the next
//! snapshot. All hidden state of a live tracker (speed smoothing seed, last
//! altitude, running totals) lives in the snapshot itself.
//!
//! Invariants kept across updates within a session: total distance, calories,
//! steps, elevation gain and elevation loss never decrease.

use serde::{Deserialize, Serialize};

use crate::calories::{incremental_calories, MetBands};
use crate::geo_utils::{distance_meters, meters_to_km, mps_to_kmh};
use crate::{Coordinate, TerrainType};

/// Tuning for the metrics accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Segment distances below this are not added to the total.
    /// Default: 1.0 meter
    pub min_segment_meters: f64,

    /// Weight of the newest reading in the speed EWMA.
    /// Default: 0.3 (smoothed = smoothed * 0.7 + new * 0.3)
    pub speed_smoothing: f64,

    /// Average speed stays 0 until the session is longer than this.
    /// Default: 10.0 seconds
    pub min_average_duration_secs: f64,

    /// Average speed stays 0 until the distance reaches this.
    /// Default: 0.01 km
    pub min_average_distance_km: f64,

    /// Calories are not accrued below this speed.
    /// Default: 0.1 km/h
    pub min_calorie_speed_kmh: f64,

    /// Athlete body weight for the MET model.
    /// Default: 70.0 kg
    pub body_weight_kg: f64,

    /// Average step length for step estimation.
    /// Default: 0.75 meters
    pub step_length_meters: f64,

    /// Smoothed altitude changes below this are ignored.
    /// Default: 0.5 meters
    pub elevation_noise_meters: f64,

    /// MET curve used for calories.
    pub met_bands: MetBands,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            min_segment_meters: 1.0,
            speed_smoothing: 0.3,
            min_average_duration_secs: 10.0,
            min_average_distance_km: 0.01,
            min_calorie_speed_kmh: 0.1,
            body_weight_kg: 70.0,
            step_length_meters: 0.75,
            elevation_noise_meters: 0.5,
            met_bands: MetBands::default(),
        }
    }
}

/// Immutable metrics value for one point in a session.
///
/// Serialized field names follow the tracking API contract.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct MetricsSnapshot {
    /// Total distance in meters
    #[serde(rename = "totalDistance")]
    pub total_distance_m: f64,
    /// Smoothed current speed in km/h
    #[serde(rename = "currentSpeed")]
    pub current_speed_kmh: f64,
    /// Distance over active duration, in km/h
    #[serde(rename = "averageSpeed")]
    pub average_speed_kmh: f64,
    /// Calorie estimate in kcal
    #[serde(rename = "calories")]
    pub calories_kcal: f64,
    /// Step estimate
    pub steps: u64,
    /// Active seconds since session start, excluding pauses
    #[serde(rename = "duration")]
    pub duration_secs: f64,
    /// Elevation gain in meters
    #[serde(rename = "elevationGain")]
    pub elevation_gain_m: f64,
    /// Elevation loss in meters (positive)
    #[serde(rename = "elevationLoss")]
    pub elevation_loss_m: f64,
    /// Altitude of the latest sample that reported one
    #[serde(rename = "currentAltitude")]
    pub current_altitude_m: f64,
    #[serde(rename = "terrainType")]
    pub terrain: TerrainType,
    /// Accepted samples folded into this snapshot
    #[serde(rename = "sampleCount")]
    pub sample_count: u32,
    /// Whether `current_speed_kmh` holds an observed value yet
    #[serde(skip)]
    pub speed_seeded: bool,
}

impl MetricsSnapshot {
    /// Whole seconds for display.
    pub fn duration_display_secs(&self) -> u64 {
        self.duration_secs.max(0.0).floor() as u64
    }

    /// Total distance in kilometers.
    pub fn total_distance_km(&self) -> f64 {
        meters_to_km(self.total_distance_m)
    }
}

/// Altitude change released by the newest sample on the smoothed altitude series.
///
/// The series replaces every interior sample by the centered mean of itself and
/// its two neighbours. It starts raw at the first sample of the route and again
/// after any sample without altitude. A sample becomes interior once its
/// successor arrives, so for a trailing window `[w, a, b, c]` ending at the new
/// sample `c` the delta is `smoothed(b) - smoothed(a)`. Successive deltas
/// telescope: their sum is the smoothed altitude of the latest interior sample
/// minus the altitude where the series started.
///
/// Pass at least the last four samples of the route. `None` with fewer than
/// three samples, or when `a`, `b` or `c` has no altitude.
pub fn smoothed_elevation_delta(window: &[Coordinate]) -> Option<f64> {
    let n = window.len();
    if n < 3 {
        return None;
    }
    let c = window[n - 1].finite_altitude()?;
    let b = window[n - 2].finite_altitude()?;
    let a = window[n - 3].finite_altitude()?;

    let smoothed_b = (a + b + c) / 3.0;
    let smoothed_a = match n.checked_sub(4).and_then(|i| window[i].finite_altitude()) {
        Some(w) => (w + a + b) / 3.0,
        None => a,
    };

    Some(smoothed_b - smoothed_a)
}

/// Speed of an accepted sample in km/h, if it carries a usable one.
fn observed_speed_kmh(sample: &Coordinate) -> Option<f64> {
    sample
        .speed
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(mps_to_kmh)
}

/// Folds accepted samples into [`MetricsSnapshot`]s.
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    config: MetricsConfig,
}

impl MetricsAccumulator {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Snapshot for the first sample of a session: accumulators at zero.
    ///
    /// The speed EWMA is seeded only by a positive device speed; otherwise it
    /// stays unseeded until the first derived speed arrives.
    pub fn initial(&self, sample: &Coordinate, active_ms: i64) -> MetricsSnapshot {
        let seed = if sample.has_device_speed() {
            observed_speed_kmh(sample)
        } else {
            None
        };
        MetricsSnapshot {
            current_speed_kmh: seed.unwrap_or(0.0),
            speed_seeded: seed.is_some(),
            current_altitude_m: sample.finite_altitude().unwrap_or(0.0),
            duration_secs: active_secs(active_ms),
            sample_count: 1,
            ..MetricsSnapshot::default()
        }
    }

    /// Next snapshot after appending the last element of `recent`.
    ///
    /// `recent` is the tail of the route ending with the new sample; four
    /// samples are enough for elevation smoothing. With a single sample (or a
    /// previous snapshot that has seen none) this is [`Self::initial`].
    pub fn next(&self, prev: &MetricsSnapshot, recent: &[Coordinate], active_ms: i64) -> MetricsSnapshot {
        let Some(current) = recent.last() else {
            return self.refresh_duration(prev, active_ms);
        };
        if recent.len() < 2 || prev.sample_count == 0 {
            let mut first = self.initial(current, active_ms);
            first.terrain = prev.terrain;
            return first;
        }
        let previous = &recent[recent.len() - 2];

        let mut next = prev.clone();
        next.sample_count = prev.sample_count.saturating_add(1);

        // Distance
        let segment = distance_meters(previous, current);
        let counted = if segment >= self.config.min_segment_meters {
            segment
        } else {
            0.0
        };
        next.total_distance_m += counted;

        // Speed (EWMA, seeded by the first observed value)
        if let Some(speed_kmh) = observed_speed_kmh(current) {
            next.current_speed_kmh = if prev.speed_seeded {
                let alpha = self.config.speed_smoothing;
                prev.current_speed_kmh * (1.0 - alpha) + speed_kmh * alpha
            } else {
                speed_kmh
            };
            next.speed_seeded = true;
        }

        // Calories (incremental only)
        next.calories_kcal += incremental_calories(
            &self.config.met_bands,
            next.current_speed_kmh,
            meters_to_km(counted),
            self.config.body_weight_kg,
            self.config.min_calorie_speed_kmh,
        );

        // Steps (recomputed from distance)
        next.steps = self.steps_for_distance(next.total_distance_m).max(prev.steps);

        // Elevation
        if let Some(altitude) = current.finite_altitude() {
            next.current_altitude_m = altitude;
        }
        let tail_start = recent.len().saturating_sub(4);
        if let Some(delta) = smoothed_elevation_delta(&recent[tail_start..]) {
            if delta.abs() >= self.config.elevation_noise_meters {
                if delta > 0.0 {
                    next.elevation_gain_m += delta;
                } else {
                    next.elevation_loss_m += delta.abs();
                }
            }
        }

        self.apply_duration(&mut next, active_ms);
        next
    }

    /// Same snapshot with duration and average speed brought up to `active_ms`.
    pub fn refresh_duration(&self, prev: &MetricsSnapshot, active_ms: i64) -> MetricsSnapshot {
        let mut next = prev.clone();
        self.apply_duration(&mut next, active_ms);
        next
    }

    fn apply_duration(&self, snapshot: &mut MetricsSnapshot, active_ms: i64) {
        snapshot.duration_secs = active_secs(active_ms);
        snapshot.average_speed_kmh = self.average_speed(snapshot.total_distance_m, snapshot.duration_secs);
    }

    /// Average speed in km/h, 0 until both minimums are reached.
    pub fn average_speed(&self, total_distance_m: f64, duration_secs: f64) -> f64 {
        let distance_km = meters_to_km(total_distance_m);
        if duration_secs <= self.config.min_average_duration_secs
            || distance_km < self.config.min_average_distance_km
        {
            return 0.0;
        }
        distance_km / (duration_secs / 3600.0)
    }

    /// Step estimate for a distance.
    pub fn steps_for_distance(&self, total_distance_m: f64) -> u64 {
        if self.config.step_length_meters <= 0.0 {
            return 0;
        }
        (total_distance_m / self.config.step_length_meters).round() as u64
    }
}

fn active_secs(active_ms: i64) -> f64 {
    active_ms.max(0) as f64 / 1000.0
}
