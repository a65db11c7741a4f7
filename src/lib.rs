//! # Aerofit Tracker
//!
//! Live GPS track processing for workout recording.
//!
//! This library provides:
//! - Filtering of noisy location samples (no-fix, accuracy, GPS jumps)
//! - Incremental motion metrics (distance, speed, calories, steps, elevation)
//! - Terrain classification (flat / uphill / downhill)
//! - A session state machine with observers and a sync handoff contract
//!
//! ## Features
//!
//! - **`http`** - Enable the HTTP sync adapter
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use aerofit_tracker::{Coordinate, ManualClock, TrackSession, TrackerConfig};
//!
//! let clock = Arc::new(ManualClock::new(0));
//! let mut session = TrackSession::new(TrackerConfig::default(), clock.clone(), Arc::new(|| true));
//! session.start().unwrap();
//!
//! for i in 0..3 {
//!     clock.set(i * 10_000);
//!     let sample = Coordinate::new(51.5074 + i as f64 * 0.0004, -0.1278, i * 10_000);
//!     session.ingest(sample).unwrap();
//! }
//!
//! let snapshot = session.snapshot();
//! println!("{:.0} m in {} s", snapshot.metrics.total_distance_m, snapshot.metrics.duration_display_secs());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackError};

// Geographic utilities (distance, grade, unit conversions)
pub mod geo_utils;

// Sample filter (accept / reject / correct)
pub mod filter;
pub use filter::{FilterConfig, FilterDecision, RejectReason, SampleFilter};

// MET calorie model
pub mod calories;
pub use calories::{MetBands, SpeedBand};

// Running metrics
pub mod metrics;
pub use metrics::{MetricsAccumulator, MetricsConfig, MetricsSnapshot};

// Terrain classification
pub mod terrain;
pub use terrain::{TerrainClassifier, TerrainConfig};

// Append-only route storage
pub mod route;
pub use route::Route;

// Time source
pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

// Configuration bundle
pub mod config;
pub use config::TrackerConfig;

// Track session state machine
pub mod session;
pub use session::{
    FilterStats, IngestOutcome, PermissionProvider, SessionEvent, SessionObserver, TrackSession,
    TrackSnapshot,
};

// Single-consumer channel boundary
pub mod driver;
pub use driver::{spawn_session, SessionHandle};

// Process-wide shared session
pub mod engine;
pub use engine::{set_location_permission, with_session, SESSION};

// Sync adapter boundary
pub mod sync;
pub use sync::{SyncAdapter, SyncConfig, SyncPayload, SyncScheduler};

// HTTP sync adapter
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::HttpSyncAdapter;

// Display formatting helpers
pub mod format;

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("AerofitTracker"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A raw location sample as delivered by the location provider.
///
/// # Example
/// ```
/// use aerofit_tracker::Coordinate;
/// let sample = Coordinate::new(51.5074, -0.1278, 1_700_000_000_000)
///     .with_altitude(35.0)
///     .with_accuracy(8.0);
/// assert!(sample.has_fix());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Coordinate {
    /// Degrees, [-90, 90]
    pub latitude: f64,
    /// Degrees, [-180, 180]
    pub longitude: f64,
    /// Meters above sea level
    pub altitude: Option<f64>,
    /// Device-reported speed in m/s
    pub speed: Option<f64>,
    /// Horizontal accuracy radius in meters
    pub accuracy: Option<f64>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Coordinate {
    /// Create a sample with position and time only.
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            speed: None,
            accuracy: None,
            timestamp,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Check if the coordinates are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Valid coordinates that are not the `(0, 0)` "no fix" sentinel.
    pub fn has_fix(&self) -> bool {
        self.is_valid() && !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    /// Altitude when present and finite.
    pub fn finite_altitude(&self) -> Option<f64> {
        self.altitude.filter(|a| a.is_finite())
    }

    /// Device speed is present, finite and strictly positive.
    pub fn has_device_speed(&self) -> bool {
        matches!(self.speed, Some(s) if s.is_finite() && s > 0.0)
    }
}

/// Terrain label derived from the recent grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum TerrainType {
    #[default]
    Flat,
    Uphill,
    Downhill,
}

/// Lifecycle state of a track session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum SessionState {
    #[default]
    Idle,
    Active,
    Paused,
    Stopped,
}

/// Bounding box for a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from samples.
    pub fn from_points(points: &[Coordinate]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds as (latitude, longitude).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(51.5074, -0.1278, 0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0, 0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0, 0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0, 0).is_valid());
    }

    #[test]
    fn test_sentinel_has_no_fix() {
        assert!(Coordinate::new(0.0, 0.0, 0).is_valid());
        assert!(!Coordinate::new(0.0, 0.0, 0).has_fix());
        assert!(Coordinate::new(0.0, 0.5, 0).has_fix());
    }

    #[test]
    fn test_device_speed() {
        let base = Coordinate::new(51.5, -0.12, 0);
        assert!(!base.has_device_speed());
        assert!(!base.clone().with_speed(0.0).has_device_speed());
        assert!(!base.clone().with_speed(-1.0).has_device_speed());
        assert!(base.with_speed(2.5).has_device_speed());
    }

    #[test]
    fn test_finite_altitude() {
        let base = Coordinate::new(51.5, -0.12, 0);
        assert_eq!(base.finite_altitude(), None);
        assert_eq!(base.clone().with_altitude(f64::NAN).finite_altitude(), None);
        assert_eq!(base.with_altitude(35.0).finite_altitude(), Some(35.0));
    }

    #[test]
    fn test_bounds_center() {
        let points = vec![
            Coordinate::new(51.0, -1.0, 0),
            Coordinate::new(52.0, 1.0, 1000),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.center(), (51.5, 0.0));
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_coordinate_json_shape() {
        let json = serde_json::to_value(Coordinate::new(1.0, 2.0, 3).with_speed(1.5)).unwrap();
        assert_eq!(json["latitude"], 1.0);
        assert_eq!(json["speed"], 1.5);
        assert!(json["altitude"].is_null());
        assert_eq!(json["timestamp"], 3);
    }
}
