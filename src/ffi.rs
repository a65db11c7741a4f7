//! FFI bindings for mobile platforms (iOS/Android).
//!
//! UniFFI exports over the shared session in [`crate::engine`]. The location
//! callback on the host side calls `tracker_ingest` for every fix; the UI
//! polls `tracker_metrics` or reads `tracker_snapshot_json`.

use std::sync::{Arc, Mutex, Weak};

use log::{info, warn};
use once_cell::sync::Lazy;

use crate::engine::{set_location_permission, with_session};
use crate::error::{Result, TrackError};
use crate::format::{format_duration, format_pace};
use crate::session::SessionObserver;
use crate::sync::{SyncAdapter, SyncPayload};
use crate::{
    init_logging, Coordinate, FilterStats, MetricsSnapshot, SessionState, SyncScheduler,
    SystemClock, TrackerConfig,
};

// ============================================================================
// Sync Callback Interface
// ============================================================================

/// Receives sync payloads as JSON. Implement this in Kotlin/Swift and post
/// the body to the tracking API; delivery and retries stay on the host side.
///
/// Invoked while the tracker is locked: hand the payload off to another
/// queue and do not call `tracker_*` functions from inside the callback.
#[uniffi::export(callback_interface)]
pub trait SyncCallback: Send + Sync {
    fn on_sync_payload(&self, payload_json: String, is_final: bool);
}

struct CallbackSyncAdapter {
    callback: Box<dyn SyncCallback>,
}

impl SyncAdapter for CallbackSyncAdapter {
    fn submit(&self, payload: SyncPayload) -> Result<()> {
        let json = payload.to_json()?;
        self.callback.on_sync_payload(json, payload.is_final_sync);
        Ok(())
    }
}

/// Keeps the registered scheduler alive; the session only holds it weakly.
static SYNC_SCHEDULER: Lazy<Mutex<Option<Arc<SyncScheduler>>>> = Lazy::new(|| Mutex::new(None));

// ============================================================================
// Lifecycle
// ============================================================================

/// Initialize logging (call once at app startup).
#[uniffi::export]
pub fn tracker_init() {
    init_logging();
    info!("[AerofitTracker] Initialized");
}

/// Replace the tracker configuration from a JSON document.
/// Only allowed while no recording is running.
#[uniffi::export]
pub fn tracker_configure(config_json: String) -> std::result::Result<(), TrackError> {
    let config = TrackerConfig::from_json(&config_json)?;
    with_session(|s| s.configure(config))
}

/// Report the result of the host's location permission flow.
#[uniffi::export]
pub fn tracker_set_location_permission(granted: bool) {
    set_location_permission(granted);
}

/// Register the sync callback, replacing any previous one.
#[uniffi::export]
pub fn tracker_set_sync_callback(callback: Box<dyn SyncCallback>) {
    let sync_config = with_session(|s| s.config().sync.clone());
    let scheduler = Arc::new(SyncScheduler::new(
        sync_config,
        Arc::new(CallbackSyncAdapter { callback }),
        Arc::new(SystemClock),
    ));
    let observer: Weak<dyn SessionObserver> = Arc::downgrade(&scheduler) as Weak<dyn SessionObserver>;
    with_session(|s| s.add_observer(observer));

    let mut slot = SYNC_SCHEDULER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = Some(scheduler);
    info!("[AerofitTracker] Sync callback registered");
}

#[uniffi::export]
pub fn tracker_start() -> std::result::Result<(), TrackError> {
    with_session(|s| s.start())
}

/// Offer one location fix. Returns whether it was added to the route.
#[uniffi::export]
pub fn tracker_ingest(sample: Coordinate) -> std::result::Result<bool, TrackError> {
    with_session(|s| s.ingest(sample)).map(|outcome| outcome.is_accepted())
}

#[uniffi::export]
pub fn tracker_pause() -> std::result::Result<(), TrackError> {
    with_session(|s| s.pause())
}

#[uniffi::export]
pub fn tracker_resume() -> std::result::Result<(), TrackError> {
    with_session(|s| s.resume())
}

/// Stop the recording and return the final metrics.
#[uniffi::export]
pub fn tracker_stop() -> std::result::Result<MetricsSnapshot, TrackError> {
    with_session(|s| s.stop()).map(|snapshot| snapshot.metrics)
}

// ============================================================================
// Queries
// ============================================================================

#[uniffi::export]
pub fn tracker_state() -> SessionState {
    with_session(|s| s.state())
}

#[uniffi::export]
pub fn tracker_metrics() -> MetricsSnapshot {
    with_session(|s| s.snapshot().metrics)
}

#[uniffi::export]
pub fn tracker_stats() -> FilterStats {
    with_session(|s| s.stats())
}

/// Full snapshot (state, route, metrics) as JSON.
#[uniffi::export]
pub fn tracker_snapshot_json() -> String {
    let snapshot = with_session(|s| s.snapshot());
    serde_json::to_string(&snapshot).unwrap_or_else(|e| {
        warn!("[AerofitTracker] Failed to serialize snapshot: {}", e);
        "{}".to_string()
    })
}

/// Simplified route as flat [lat, lng, lat, lng, ...] for the map overlay.
#[uniffi::export]
pub fn tracker_route_flat(tolerance_meters: f64) -> Vec<f64> {
    with_session(|s| {
        s.snapshot()
            .route
            .simplified(tolerance_meters)
            .iter()
            .flat_map(|p| [p.latitude, p.longitude])
            .collect()
    })
}

/// Active seconds including time since the last fix, for the ticking timer.
#[uniffi::export]
pub fn tracker_live_duration() -> String {
    let secs = with_session(|s| s.live_duration_secs());
    format_duration(secs.max(0.0).floor() as u64)
}

#[uniffi::export]
pub fn tracker_format_pace(speed_kmh: f64) -> String {
    format_pace(speed_kmh)
}
