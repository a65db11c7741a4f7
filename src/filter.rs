//! Sample filter: accept, reject or correct raw location samples.
//!
//! Rules are applied in order against the last accepted sample:
//! 1. no fix (non-finite, out of range or the `(0, 0)` sentinel) → reject
//! 2. reported accuracy worse than the threshold, or not finite → reject
//! 3. jump from the last accepted sample above the threshold → reject
//! 4. missing or zero device speed → derive it from distance / elapsed time
//!
//! The filter has no side effects. The session appends accepted samples.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::{distance_meters, elapsed_seconds};
use crate::Coordinate;

/// Thresholds for the sample filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct FilterConfig {
    /// Samples with a reported horizontal accuracy above this are dropped.
    /// Default: 30.0 meters
    pub max_accuracy_meters: f64,

    /// Maximum distance from the last accepted sample before a sample is
    /// treated as a GPS jump.
    /// Default: 50.0 meters (continuous tracking)
    pub max_jump_meters: f64,
}

impl FilterConfig {
    /// Thresholds for continuous tracking at ~1 Hz.
    pub fn continuous() -> Self {
        Self {
            max_accuracy_meters: 30.0,
            max_jump_meters: 50.0,
        }
    }

    /// Thresholds for sparse single updates, where fixes are further apart.
    pub fn single_update() -> Self {
        Self {
            max_accuracy_meters: 30.0,
            max_jump_meters: 100.0,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::continuous()
    }
}

/// Why a sample was dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Non-finite, out-of-range or `(0, 0)` coordinates
    InvalidSample,
    /// Reported accuracy exceeded the threshold
    LowAccuracy { accuracy: f64, threshold: f64 },
    /// Distance from the last accepted sample exceeded the jump threshold
    JumpRejected { distance: f64, threshold: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InvalidSample => write!(f, "invalid sample (no fix)"),
            RejectReason::LowAccuracy {
                accuracy,
                threshold,
            } => write!(f, "low accuracy {:.1}m > {:.1}m", accuracy, threshold),
            RejectReason::JumpRejected {
                distance,
                threshold,
            } => write!(f, "GPS jump {:.1}m > {:.1}m", distance, threshold),
        }
    }
}

/// Outcome of filtering one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterDecision {
    /// The sample passed; speed may have been filled in.
    Accept(Coordinate),
    /// The sample was dropped.
    Reject(RejectReason),
}

impl FilterDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterDecision::Accept(_))
    }
}

/// Stateless sample filter.
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    config: FilterConfig,
}

impl SampleFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Decide whether `candidate` is accepted relative to `last` accepted sample.
    pub fn evaluate(&self, last: Option<&Coordinate>, candidate: &Coordinate) -> FilterDecision {
        let decision = self.apply_rules(last, candidate);
        if let FilterDecision::Reject(reason) = &decision {
            debug!(
                "[SampleFilter] Rejected sample at {} ({:.6}, {:.6}): {}",
                candidate.timestamp, candidate.latitude, candidate.longitude, reason
            );
        }
        decision
    }

    fn apply_rules(&self, last: Option<&Coordinate>, candidate: &Coordinate) -> FilterDecision {
        if !candidate.has_fix() {
            return FilterDecision::Reject(RejectReason::InvalidSample);
        }

        if let Some(accuracy) = candidate.accuracy {
            if !accuracy.is_finite() || accuracy > self.config.max_accuracy_meters {
                return FilterDecision::Reject(RejectReason::LowAccuracy {
                    accuracy,
                    threshold: self.config.max_accuracy_meters,
                });
            }
        }

        let mut accepted = candidate.clone();

        if let Some(last) = last {
            let distance = distance_meters(last, candidate);
            if distance > self.config.max_jump_meters {
                return FilterDecision::Reject(RejectReason::JumpRejected {
                    distance,
                    threshold: self.config.max_jump_meters,
                });
            }

            if !candidate.has_device_speed() {
                let elapsed = elapsed_seconds(last.timestamp, candidate.timestamp);
                let derived = if elapsed > 0.0 { distance / elapsed } else { 0.0 };
                accepted.speed = Some(derived);
            }
        }

        FilterDecision::Accept(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last() -> Coordinate {
        Coordinate::new(37.7749, -122.4194, 0)
    }

    #[test]
    fn test_rejects_sentinel_and_non_finite() {
        let filter = SampleFilter::default();
        let sentinel = Coordinate::new(0.0, 0.0, 1000);
        assert_eq!(
            filter.evaluate(Some(&last()), &sentinel),
            FilterDecision::Reject(RejectReason::InvalidSample)
        );

        let nan = Coordinate::new(f64::NAN, -122.4194, 1000);
        assert_eq!(
            filter.evaluate(None, &nan),
            FilterDecision::Reject(RejectReason::InvalidSample)
        );
    }

    #[test]
    fn test_rejects_low_accuracy_regardless_of_position() {
        let filter = SampleFilter::default();
        let candidate = last().with_accuracy(50.0);
        assert!(matches!(
            filter.evaluate(Some(&last()), &candidate),
            FilterDecision::Reject(RejectReason::LowAccuracy { .. })
        ));
        assert!(!filter.evaluate(None, &candidate).is_accepted());
    }

    #[test]
    fn test_rejects_non_finite_accuracy() {
        let filter = SampleFilter::default();
        for accuracy in [f64::NAN, f64::INFINITY] {
            let candidate = Coordinate::new(37.7750, -122.4194, 1000).with_accuracy(accuracy);
            assert!(matches!(
                filter.evaluate(Some(&last()), &candidate),
                FilterDecision::Reject(RejectReason::LowAccuracy { .. })
            ));
        }
    }

    #[test]
    fn test_accepts_accuracy_at_threshold() {
        let filter = SampleFilter::default();
        let candidate = Coordinate::new(37.7750, -122.4194, 1000).with_accuracy(30.0);
        assert!(filter.evaluate(Some(&last()), &candidate).is_accepted());
    }

    #[test]
    fn test_rejects_jump() {
        let filter = SampleFilter::default();
        // ~200 m north within 1 s
        let candidate = Coordinate::new(37.7767, -122.4194, 1000);
        match filter.evaluate(Some(&last()), &candidate) {
            FilterDecision::Reject(RejectReason::JumpRejected { distance, threshold }) => {
                assert!(distance > 180.0 && distance < 220.0);
                assert_eq!(threshold, 50.0);
            }
            other => panic!("expected jump rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_single_update_preset_allows_larger_gap() {
        let filter = SampleFilter::new(FilterConfig::single_update());
        // ~78 m north
        let candidate = Coordinate::new(37.7756, -122.4194, 10_000);
        assert!(filter.evaluate(Some(&last()), &candidate).is_accepted());
        assert!(!SampleFilter::default()
            .evaluate(Some(&last()), &candidate)
            .is_accepted());
    }

    #[test]
    fn test_derives_missing_speed() {
        let filter = SampleFilter::default();
        // ~22 m north, 10 s later
        let candidate = Coordinate::new(37.7751, -122.4194, 10_000);
        match filter.evaluate(Some(&last()), &candidate) {
            FilterDecision::Accept(sample) => {
                let speed = sample.speed.unwrap();
                assert!((speed - 2.22).abs() < 0.05, "got {}", speed);
            }
            other => panic!("expected accept, got {:?}", other),
        }
    }

    #[test]
    fn test_derives_zero_speed_for_duplicate_timestamp() {
        let filter = SampleFilter::default();
        let candidate = Coordinate::new(37.7751, -122.4194, 0).with_speed(0.0);
        match filter.evaluate(Some(&last()), &candidate) {
            FilterDecision::Accept(sample) => assert_eq!(sample.speed, Some(0.0)),
            other => panic!("expected accept, got {:?}", other),
        }
    }

    #[test]
    fn test_keeps_device_speed() {
        let filter = SampleFilter::default();
        let candidate = Coordinate::new(37.7751, -122.4194, 10_000).with_speed(3.1);
        match filter.evaluate(Some(&last()), &candidate) {
            FilterDecision::Accept(sample) => assert_eq!(sample.speed, Some(3.1)),
            other => panic!("expected accept, got {:?}", other),
        }
    }

    #[test]
    fn test_first_sample_accepted_without_speed() {
        let filter = SampleFilter::default();
        match filter.evaluate(None, &last()) {
            FilterDecision::Accept(sample) => assert_eq!(sample.speed, None),
            other => panic!("expected accept, got {:?}", other),
        }
    }
}
