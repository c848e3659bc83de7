//! Session orchestration: status model, callbacks, controller and transcript
//! accumulation.

pub mod controller;
pub mod transcript;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use controller::{LISTENING_SIGNAL, LiveSessionController, SessionRuntime, SinkFactory};
pub use transcript::{TranscriptAccumulator, TranscriptEntry, TranscriptUpdate};

use crate::core::media::{AcquisitionError, VideoSurface};
use crate::core::transport::TransportError;
use crate::persona::PersonaProfile;

/// Observable session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No session; `start` is allowed
    #[default]
    Inactive,
    /// Media acquired or being acquired, transport opening
    Connecting,
    /// Streaming
    Active,
    /// Terminal failure; teardown in progress, settles at `Inactive`
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Inactive => write!(f, "inactive"),
            SessionStatus::Connecting => write!(f, "connecting"),
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Error => write!(f, "error"),
        }
    }
}

/// Errors surfaced by the session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A session is already open; close it before starting another
    #[error("A session is already active")]
    AlreadyActive,

    /// The operation needs an active session
    #[error("No active session")]
    NotActive,

    /// `close` was requested while the start sequence was still in flight
    #[error("Session start was cancelled")]
    Cancelled,

    /// Tool set or persona configuration defect
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single-shot generation call failed; the session itself is fine
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Hardware acquisition failed; no session was created
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    /// The streaming transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Observers the embedding shell wires into a session.
///
/// Invoked on the session's event loop; implementations should hand off to
/// their own scheduling rather than block.
#[derive(Clone)]
pub struct SessionCallbacks {
    pub on_status: Arc<dyn Fn(SessionStatus) + Send + Sync>,
    pub on_transcript_update: Arc<dyn Fn(TranscriptUpdate) + Send + Sync>,
    pub on_turn_committed: Arc<dyn Fn(Vec<TranscriptEntry>) + Send + Sync>,
}

impl SessionCallbacks {
    /// Callbacks that ignore everything.
    pub fn noop() -> Self {
        Self {
            on_status: Arc::new(|_| {}),
            on_transcript_update: Arc::new(|_| {}),
            on_turn_committed: Arc::new(|_| {}),
        }
    }
}

/// Arguments to [`LiveSessionController::start`].
pub struct StartParams {
    /// Resolved persona: instruction, tools, voice, visual capability
    pub profile: PersonaProfile,
    /// Display surface for visual personas; ignored for voice-only ones
    pub video_surface: Option<Arc<dyn VideoSurface>>,
    pub callbacks: SessionCallbacks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Inactive.to_string(), "inactive");
        assert_eq!(SessionStatus::Connecting.to_string(), "connecting");
        assert_eq!(SessionStatus::Active.to_string(), "active");
        assert_eq!(SessionStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            SessionError::AlreadyActive.to_string(),
            "A session is already active"
        );
        assert_eq!(SessionError::NotActive.to_string(), "No active session");
    }
}
