//! Sync adapter boundary.
//!
//! [`SyncScheduler`] observes a session and hands payloads to a
//! [`SyncAdapter`]: one as soon as the first sample lands, then at most once
//! per interval while samples keep arriving, and a final one on stop.
//! Delivery, retries and failures belong to the adapter; nothing flows back
//! into the session.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, TimeZone, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::Result;
use crate::session::{SessionEvent, SessionObserver, TrackSnapshot};
use crate::{MetricsSnapshot, Route};

/// Sync scheduling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Minimum time between periodic syncs.
    /// Default: 30 seconds
    pub interval_secs: u64,
    /// Account the payloads are attributed to.
    pub user_id: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            user_id: String::new(),
        }
    }
}

/// Body of a tracking sync request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    pub user_id: String,
    /// ISO-8601, UTC, millisecond precision
    pub timestamp: String,
    pub route_data: Route,
    pub metrics: MetricsSnapshot,
    pub is_final_sync: bool,
}

impl SyncPayload {
    pub fn new(user_id: &str, now_ms: i64, snapshot: &TrackSnapshot, is_final_sync: bool) -> Self {
        Self {
            user_id: user_id.to_string(),
            timestamp: iso_timestamp(now_ms),
            route_data: snapshot.route.clone(),
            metrics: snapshot.metrics.clone(),
            is_final_sync,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn iso_timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Transport for sync payloads.
///
/// `submit` must return promptly. An `Err` means the payload could not even be
/// handed off; the scheduler logs it and moves on.
pub trait SyncAdapter: Send + Sync {
    fn submit(&self, payload: SyncPayload) -> Result<()>;
}

/// Session observer that turns updates into sync payloads.
pub struct SyncScheduler {
    config: SyncConfig,
    adapter: Arc<dyn SyncAdapter>,
    clock: Arc<dyn Clock>,
    last_sync_ms: Mutex<Option<i64>>,
    submitted: AtomicU32,
}

impl SyncScheduler {
    pub fn new(config: SyncConfig, adapter: Arc<dyn SyncAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            adapter,
            clock,
            last_sync_ms: Mutex::new(None),
            submitted: AtomicU32::new(0),
        }
    }

    /// Payloads handed to the adapter so far.
    pub fn submitted(&self) -> u32 {
        self.submitted.load(Ordering::Relaxed)
    }

    fn interval_ms(&self) -> i64 {
        (self.config.interval_secs as i64).saturating_mul(1000)
    }

    fn send(&self, now_ms: i64, snapshot: &TrackSnapshot, is_final: bool) {
        let payload = SyncPayload::new(&self.config.user_id, now_ms, snapshot, is_final);
        match self.adapter.submit(payload) {
            Ok(()) => {
                self.submitted.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "[SyncScheduler] Submitted {} payload ({} points)",
                    if is_final { "final" } else { "periodic" },
                    snapshot.route.len()
                );
            }
            Err(e) => warn!("[SyncScheduler] Handoff failed: {}", e),
        }
    }
}

impl SessionObserver for SyncScheduler {
    fn on_session_event(&self, event: SessionEvent, snapshot: &TrackSnapshot) {
        let now = self.clock.now_ms();
        let mut last = self
            .last_sync_ms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match event {
            SessionEvent::Started => {
                *last = None;
            }
            SessionEvent::Updated => {
                let due = match *last {
                    None => true,
                    Some(at) => now - at >= self.interval_ms(),
                };
                if due {
                    *last = Some(now);
                    self.send(now, snapshot, false);
                }
            }
            SessionEvent::Stopped => {
                *last = Some(now);
                info!("[SyncScheduler] Final sync");
                self.send(now, snapshot, true);
            }
            SessionEvent::Paused | SessionEvent::Resumed => {}
        }
    }
}
