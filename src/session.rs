//! # Track Session
//!
//! The state machine that owns one recording: the route of accepted samples and
//! the current metrics snapshot. Each raw sample flows through
//! filter → route → metrics → terrain, and every accepted sample is pushed to
//! the registered observers.
//!
//! ```text
//! Idle ──start──▶ Active ──pause──▶ Paused
//!   ▲               │  ▲──resume──────┘ │
//!   │               └──stop──▶ Stopped ◀┘
//!   └──────────(start again: fresh session)
//! ```
//!
//! The session is synchronous and single-owner. Hosts that deliver samples
//! from several threads go through [`crate::driver`] or [`crate::engine`].

use std::sync::{Arc, Weak};

use log::{debug, info, warn};
use serde::Serialize;

use crate::clock::Clock;
use crate::error::{Result, TrackError};
use crate::{
    Coordinate, FilterDecision, MetricsAccumulator, MetricsSnapshot, RejectReason, Route,
    SampleFilter, SessionState, TerrainClassifier, TerrainType, TrackerConfig,
};

// ============================================================================
// Collaborators
// ============================================================================

/// Location permission collaborator, queried by [`TrackSession::start`].
pub trait PermissionProvider: Send + Sync {
    fn location_granted(&self) -> bool;
}

impl<F> PermissionProvider for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn location_granted(&self) -> bool {
        self()
    }
}

/// What happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionEvent {
    Started,
    Updated,
    Paused,
    Resumed,
    Stopped,
}

/// Receives snapshots pushed by the session (UI, sync scheduler).
///
/// Observers are held weakly; the session never keeps one alive. Callbacks
/// run synchronously inside the session operation and must not call back
/// into the same session.
pub trait SessionObserver: Send + Sync {
    fn on_session_event(&self, event: SessionEvent, snapshot: &TrackSnapshot);
}

// ============================================================================
// Values
// ============================================================================

/// Immutable view of a session at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSnapshot {
    pub state: SessionState,
    pub route: Route,
    pub metrics: MetricsSnapshot,
    /// Set once the session has stopped; the last snapshot it will emit.
    pub is_final: bool,
}

/// Result of offering one raw sample to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Appended to the route
    Accepted { route_len: usize, terrain: TerrainType },
    /// Dropped by the sample filter; nothing changed
    Rejected(RejectReason),
    /// Dropped because the session is paused
    Ignored,
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { .. })
    }
}

/// Per-session diagnostics for dropped samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct FilterStats {
    pub accepted: u32,
    pub invalid: u32,
    pub low_accuracy: u32,
    pub jumps: u32,
    pub ignored_while_paused: u32,
}

impl FilterStats {
    fn record_rejection(&mut self, reason: &RejectReason) {
        let counter = match reason {
            RejectReason::InvalidSample => &mut self.invalid,
            RejectReason::LowAccuracy { .. } => &mut self.low_accuracy,
            RejectReason::JumpRejected { .. } => &mut self.jumps,
        };
        *counter = counter.saturating_add(1);
    }

    /// Samples dropped for any reason.
    pub fn rejected(&self) -> u32 {
        self.invalid + self.low_accuracy + self.jumps + self.ignored_while_paused
    }
}

// ============================================================================
// Track Session
// ============================================================================

pub struct TrackSession {
    state: SessionState,
    route: Route,
    metrics: MetricsSnapshot,
    stats: FilterStats,

    // Duration accounting, clock milliseconds
    started_at_ms: i64,
    paused_total_ms: i64,
    paused_at_ms: Option<i64>,

    // Pipeline
    config: TrackerConfig,
    filter: SampleFilter,
    accumulator: MetricsAccumulator,
    classifier: TerrainClassifier,

    // Collaborators
    clock: Arc<dyn Clock>,
    permissions: Arc<dyn PermissionProvider>,
    observers: Vec<Weak<dyn SessionObserver>>,
}

impl TrackSession {
    pub fn new(
        config: TrackerConfig,
        clock: Arc<dyn Clock>,
        permissions: Arc<dyn PermissionProvider>,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            route: Route::new(),
            metrics: MetricsSnapshot::default(),
            stats: FilterStats::default(),
            started_at_ms: 0,
            paused_total_ms: 0,
            paused_at_ms: None,
            filter: SampleFilter::new(config.filter.clone()),
            accumulator: MetricsAccumulator::new(config.metrics.clone()),
            classifier: TerrainClassifier::new(config.terrain.clone()),
            config,
            clock,
            permissions,
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    /// Replace the configuration. Only allowed while no recording is running.
    pub fn configure(&mut self, config: TrackerConfig) -> Result<()> {
        self.require(&[SessionState::Idle, SessionState::Stopped], "configure")?;
        config.validate()?;
        self.filter = SampleFilter::new(config.filter.clone());
        self.accumulator = MetricsAccumulator::new(config.metrics.clone());
        self.classifier = TerrainClassifier::new(config.terrain.clone());
        self.config = config;
        info!("[TrackSession] Configuration updated");
        Ok(())
    }

    /// Register an observer. Dead observers are pruned on the next emission.
    pub fn add_observer(&mut self, observer: Weak<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.iter().filter(|o| o.strong_count() > 0).count()
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Begin a fresh recording.
    ///
    /// Fails with [`TrackError::PermissionDenied`] (state unchanged) when the
    /// permission collaborator refuses.
    pub fn start(&mut self) -> Result<()> {
        self.require(&[SessionState::Idle, SessionState::Stopped], "start")?;
        if !self.permissions.location_granted() {
            warn!("[TrackSession] Start refused: location permission denied");
            return Err(TrackError::PermissionDenied);
        }

        self.route = Route::new();
        self.metrics = MetricsSnapshot::default();
        self.stats = FilterStats::default();
        self.started_at_ms = self.clock.now_ms();
        self.paused_total_ms = 0;
        self.paused_at_ms = None;
        self.state = SessionState::Active;

        info!("[TrackSession] Started at {}", self.started_at_ms);
        self.emit(SessionEvent::Started);
        Ok(())
    }

    /// Offer one raw sample.
    ///
    /// Filtered samples are a normal outcome, not an error. Only calling this
    /// before `start` or after `stop` fails.
    pub fn ingest(&mut self, sample: Coordinate) -> Result<IngestOutcome> {
        match self.state {
            SessionState::Active => {}
            SessionState::Paused => {
                self.stats.ignored_while_paused = self.stats.ignored_while_paused.saturating_add(1);
                debug!("[TrackSession] Ignored sample at {} while paused", sample.timestamp);
                return Ok(IngestOutcome::Ignored);
            }
            state => {
                warn!("[TrackSession] Ingest rejected in state {:?}", state);
                return Err(TrackError::InvalidState {
                    operation: "ingest",
                    state,
                });
            }
        }

        let accepted = match self.filter.evaluate(self.route.last(), &sample) {
            FilterDecision::Accept(accepted) => accepted,
            FilterDecision::Reject(reason) => {
                self.stats.record_rejection(&reason);
                return Ok(IngestOutcome::Rejected(reason));
            }
        };

        self.route.push(accepted);
        let active_ms = self.active_ms(self.clock.now_ms());

        let mut next = self
            .accumulator
            .next(&self.metrics, self.route.tail(4), active_ms);
        next.terrain = self
            .classifier
            .classify(self.route.tail(self.config.terrain.window_size as usize), self.metrics.terrain);
        self.metrics = next;
        self.stats.accepted = self.stats.accepted.saturating_add(1);

        self.emit(SessionEvent::Updated);
        Ok(IngestOutcome::Accepted {
            route_len: self.route.len(),
            terrain: self.metrics.terrain,
        })
    }

    /// Freeze duration accounting and stop accepting samples.
    pub fn pause(&mut self) -> Result<()> {
        self.require(&[SessionState::Active], "pause")?;
        let now = self.clock.now_ms();
        self.metrics = self
            .accumulator
            .refresh_duration(&self.metrics, self.active_ms(now));
        self.paused_at_ms = Some(now);
        self.state = SessionState::Paused;

        info!("[TrackSession] Paused after {:.1}s active", self.metrics.duration_secs);
        self.emit(SessionEvent::Paused);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.require(&[SessionState::Paused], "resume")?;
        let now = self.clock.now_ms();
        if let Some(paused_at) = self.paused_at_ms.take() {
            self.paused_total_ms += (now - paused_at).max(0);
        }
        self.state = SessionState::Active;

        info!("[TrackSession] Resumed ({}ms paused in total)", self.paused_total_ms);
        self.emit(SessionEvent::Resumed);
        Ok(())
    }

    /// End the recording and push the final snapshot to observers.
    pub fn stop(&mut self) -> Result<TrackSnapshot> {
        self.require(&[SessionState::Active, SessionState::Paused], "stop")?;
        let now = self.clock.now_ms();
        self.metrics = self
            .accumulator
            .refresh_duration(&self.metrics, self.active_ms(now));
        self.paused_at_ms = None;
        self.state = SessionState::Stopped;

        info!(
            "[TrackSession] Stopped: {} samples, {:.1}m in {}s",
            self.route.len(),
            self.metrics.total_distance_m,
            self.metrics.duration_display_secs()
        );
        let snapshot = self.snapshot();
        self.emit(SessionEvent::Stopped);
        Ok(snapshot)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Current route, metrics and state. Never mutates.
    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            state: self.state,
            route: self.route.clone(),
            metrics: self.metrics.clone(),
            is_final: self.state == SessionState::Stopped,
        }
    }

    /// Active seconds right now, for a ticking display between samples.
    pub fn live_duration_secs(&self) -> f64 {
        match self.state {
            SessionState::Active | SessionState::Paused => {
                self.active_ms(self.clock.now_ms()).max(0) as f64 / 1000.0
            }
            _ => self.metrics.duration_secs,
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn active_ms(&self, now_ms: i64) -> i64 {
        let open_pause = self.paused_at_ms.map(|p| (now_ms - p).max(0)).unwrap_or(0);
        now_ms - self.started_at_ms - self.paused_total_ms - open_pause
    }

    fn require(&self, allowed: &[SessionState], operation: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            warn!("[TrackSession] Cannot {} while {:?}", operation, self.state);
            Err(TrackError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        self.observers.retain(|o| o.strong_count() > 0);
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for observer in self.observers.iter().filter_map(Weak::upgrade) {
            observer.on_session_event(event, &snapshot);
        }
    }
}
