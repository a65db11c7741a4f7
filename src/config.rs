//! Tracker configuration bundle.
//!
//! Every section has documented defaults; partial JSON documents fill the
//! rest from `Default`.
//!
//! ```rust
//! use aerofit_tracker::TrackerConfig;
//!
//! let config = TrackerConfig::from_json(r#"{ "filter": { "max_jump_meters": 100.0 } }"#).unwrap();
//! assert_eq!(config.filter.max_jump_meters, 100.0);
//! assert_eq!(config.filter.max_accuracy_meters, 30.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::{FilterConfig, MetricsConfig, SyncConfig, TerrainConfig};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub filter: FilterConfig,
    pub metrics: MetricsConfig,
    pub terrain: TerrainConfig,
    pub sync: SyncConfig,
}

impl TrackerConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(TrackError::ConfigError {
                    message: format!("{} must be positive, got {}", name, value),
                })
            }
        }

        positive("filter.max_accuracy_meters", self.filter.max_accuracy_meters)?;
        positive("filter.max_jump_meters", self.filter.max_jump_meters)?;
        positive("metrics.body_weight_kg", self.metrics.body_weight_kg)?;
        positive("metrics.step_length_meters", self.metrics.step_length_meters)?;

        let alpha = self.metrics.speed_smoothing;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(TrackError::ConfigError {
                message: format!("metrics.speed_smoothing must be in (0, 1], got {}", alpha),
            });
        }

        if !self.metrics.met_bands.is_monotonic() {
            return Err(TrackError::ConfigError {
                message: "metrics.met_bands must ascend in speed and never decrease in MET"
                    .to_string(),
            });
        }

        if self.terrain.min_window_size < 2 || self.terrain.window_size < self.terrain.min_window_size {
            return Err(TrackError::ConfigError {
                message: format!(
                    "terrain window {} must be >= min window {} >= 2",
                    self.terrain.window_size, self.terrain.min_window_size
                ),
            });
        }

        if self.terrain.downhill_grade_percent > self.terrain.uphill_grade_percent {
            return Err(TrackError::ConfigError {
                message: "terrain downhill grade must not exceed uphill grade".to_string(),
            });
        }

        if self.sync.interval_secs == 0 {
            return Err(TrackError::ConfigError {
                message: "sync.interval_secs must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}
