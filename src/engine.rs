//! # Shared Session
//!
//! Process-wide [`TrackSession`] for hosts that deliver location events from
//! several threads (and for the FFI layer). Every operation takes the single
//! mutex, so `ingest`, transitions and `snapshot` never interleave and a
//! snapshot always pairs a route with the metrics computed from it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::info;
use once_cell::sync::Lazy;

use crate::{SystemClock, TrackSession, TrackerConfig};

/// Location permission as last reported by the host. Denied until told otherwise.
static LOCATION_PERMISSION: AtomicBool = AtomicBool::new(false);

/// Global session on the wall clock, gated by [`set_location_permission`].
pub static SESSION: Lazy<Mutex<TrackSession>> = Lazy::new(|| {
    Mutex::new(TrackSession::new(
        TrackerConfig::default(),
        Arc::new(SystemClock),
        Arc::new(|| LOCATION_PERMISSION.load(Ordering::SeqCst)),
    ))
});

/// Record the outcome of the host's permission flow.
pub fn set_location_permission(granted: bool) {
    LOCATION_PERMISSION.store(granted, Ordering::SeqCst);
    info!("[TrackSession] Location permission {}", if granted { "granted" } else { "denied" });
}

/// Run `f` with exclusive access to the global session.
pub fn with_session<F, R>(f: F) -> R
where
    F: FnOnce(&mut TrackSession) -> R,
{
    // A panicking observer poisons the lock; session state is already complete by then.
    let mut session = SESSION.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SessionState, TrackError};

    #[test]
    fn test_with_session_lifecycle() {
        with_session(|s| {
            if matches!(s.state(), SessionState::Active | SessionState::Paused) {
                s.stop().unwrap();
            }
        });

        set_location_permission(false);
        assert_eq!(with_session(|s| s.start()), Err(TrackError::PermissionDenied));

        set_location_permission(true);
        with_session(|s| s.start()).unwrap();
        assert_eq!(with_session(|s| s.state()), SessionState::Active);

        let snapshot = with_session(|s| s.stop()).unwrap();
        assert!(snapshot.is_final);
        assert_eq!(with_session(|s| s.state()), SessionState::Stopped);
    }
}
