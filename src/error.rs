//! Unified error handling for the tracker.
//!
//! Filtered samples are not errors: the sample filter reports them through
//! [`crate::filter::FilterDecision`]. Only failures the caller must react to
//! (permission, invalid transitions, configuration, sync transport) live here.

use std::fmt;

use crate::SessionState;

/// Unified error type for tracker operations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum TrackError {
    /// Location permission was not granted when starting a session
    PermissionDenied,
    /// Operation is not valid in the current session state
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
    /// Configuration error
    ConfigError { message: String },
    /// JSON encoding/decoding failed
    SerializationError { message: String },
    /// Sync transport error (only produced by sync adapters, never by the session)
    SyncError {
        message: String,
        status_code: Option<u16>,
    },
    /// The session consumer thread is gone
    ChannelClosed,
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackError::PermissionDenied => {
                write!(f, "Location permission denied")
            }
            TrackError::InvalidState { operation, state } => {
                write!(f, "Cannot {} while session is {:?}", operation, state)
            }
            TrackError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            TrackError::SerializationError { message } => {
                write!(f, "Serialization error: {}", message)
            }
            TrackError::SyncError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "Sync error ({}): {}", code, message)
                } else {
                    write!(f, "Sync error: {}", message)
                }
            }
            TrackError::ChannelClosed => {
                write!(f, "Session channel closed")
            }
        }
    }
}

impl std::error::Error for TrackError {}

impl From<serde_json::Error> for TrackError {
    fn from(err: serde_json::Error) -> Self {
        TrackError::SerializationError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackError>;

/// Extension trait for converting Option to TrackError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a configuration error.
    fn ok_or_config(self, message: &str) -> Result<T>;

    /// Convert Option to Result with a closed-channel error.
    fn ok_or_closed(self) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_config(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrackError::ConfigError {
            message: message.to_string(),
        })
    }

    fn ok_or_closed(self) -> Result<T> {
        self.ok_or(TrackError::ChannelClosed)
    }
}
