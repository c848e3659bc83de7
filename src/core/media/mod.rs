//! Hardware media acquisition and release.
//!
//! [`MediaCaptureManager`] owns acquisition of the microphone (and, for
//! visual personas, the camera) for exactly the lifetime of a session. The
//! hardware itself sits behind the [`MediaBackend`] trait so embedding shells
//! can plug in their platform capture stack; a cpal-backed microphone backend
//! ships behind the `cpal-audio` feature (see [`capture`]), and
//! [`MockMediaBackend`] drives the test suite.
//!
//! The invariant that matters here: every acquired track is stopped on every
//! session-end path, including error paths, and a partially-acquired handle
//! (audio acquired, video failed) can always be released safely.

#[cfg(feature = "cpal-audio")]
pub mod capture;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised while acquiring hardware.
///
/// All variants are fatal to session start; no session is created and nothing
/// stays acquired.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// The user or platform denied access to the device
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// No usable capture device is present
    #[error("No capture device available: {0}")]
    NoDevice(String),

    /// Video capture was requested but this backend cannot provide it
    #[error("Video capture unavailable: {0}")]
    VideoUnavailable(String),

    /// Backend-specific failure
    #[error("Capture backend error: {0}")]
    Backend(String),
}

/// Kind of a captured hardware track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// One live hardware track.
///
/// `stop` must be idempotent and must release the underlying device (no
/// indicator light stays on once every track of a handle is stopped).
pub trait MediaTrack: Send + Sync {
    fn kind(&self) -> TrackKind;
    fn stop(&self);
    fn is_stopped(&self) -> bool;
}

/// Display surface a live video track can be bound to.
///
/// Voice-only personas never touch the surface.
pub trait VideoSurface: Send + Sync {
    fn attach(&self, track: Arc<dyn MediaTrack>);
    fn detach(&self);
}

/// Receiver of captured microphone frames (f32 samples in `[-1.0, 1.0]`).
pub type CaptureFrames = mpsc::UnboundedReceiver<Vec<f32>>;

/// Ownership wrapper around acquired hardware.
///
/// Exclusively owned by the session controller via [`MediaCaptureManager`];
/// dropped only after [`MediaCaptureManager::release`].
pub struct MediaHandle {
    audio: Arc<dyn MediaTrack>,
    video: Option<Arc<dyn MediaTrack>>,
    frames: Option<CaptureFrames>,
    capture_sample_rate: u32,
    bound_surface: Option<Arc<dyn VideoSurface>>,
}

impl std::fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHandle")
            .field("video", &self.video.is_some())
            .field("frames", &self.frames.is_some())
            .field("capture_sample_rate", &self.capture_sample_rate)
            .field("bound_surface", &self.bound_surface.is_some())
            .finish()
    }
}

impl MediaHandle {
    /// Assemble a handle from freshly acquired tracks.
    pub fn new(
        audio: Arc<dyn MediaTrack>,
        video: Option<Arc<dyn MediaTrack>>,
        frames: CaptureFrames,
        capture_sample_rate: u32,
    ) -> Self {
        Self {
            audio,
            video,
            frames: Some(frames),
            capture_sample_rate,
            bound_surface: None,
        }
    }

    /// Take the capture frame stream. Yields `None` after the first call.
    pub fn take_frames(&mut self) -> Option<CaptureFrames> {
        self.frames.take()
    }

    /// Microphone capture sample rate in Hz.
    pub fn capture_sample_rate(&self) -> u32 {
        self.capture_sample_rate
    }

    /// Whether this handle carries a video track.
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    /// True once every track has been stopped.
    pub fn is_released(&self) -> bool {
        self.audio.is_stopped() && self.video.as_ref().is_none_or(|v| v.is_stopped())
    }
}

/// Backend that actually talks to the platform capture stack.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Acquire the microphone, plus the camera when `needs_video`.
    ///
    /// On failure nothing may remain acquired: a backend that obtained the
    /// microphone and then failed on the camera must stop the microphone
    /// before returning the error.
    async fn acquire(&self, needs_video: bool) -> Result<MediaHandle, AcquisitionError>;
}

/// Acquires and releases hardware exclusively for the active session.
pub struct MediaCaptureManager {
    backend: Arc<dyn MediaBackend>,
}

impl MediaCaptureManager {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self { backend }
    }

    /// Acquire hardware for a session.
    pub async fn acquire(&self, needs_video: bool) -> Result<MediaHandle, AcquisitionError> {
        let handle = self.backend.acquire(needs_video).await?;
        tracing::info!(
            needs_video,
            has_video = handle.has_video(),
            sample_rate = handle.capture_sample_rate(),
            "Media acquired"
        );
        Ok(handle)
    }

    /// Attach the live video stream to a display surface.
    ///
    /// No-op for handles without a video track.
    pub fn bind(&self, handle: &mut MediaHandle, surface: Arc<dyn VideoSurface>) {
        if let Some(video) = handle.video.clone() {
            surface.attach(video);
            handle.bound_surface = Some(surface);
        }
    }

    /// Stop every hardware track and detach any bound surface.
    ///
    /// Safe to call on a partially-acquired or already-released handle.
    pub fn release(&self, handle: &mut MediaHandle) {
        if let Some(surface) = handle.bound_surface.take() {
            surface.detach();
        }
        handle.audio.stop();
        if let Some(video) = &handle.video {
            video.stop();
        }
        handle.frames = None;
        tracing::info!("Media released");
    }
}

// =============================================================================
// Mock backend
// =============================================================================

/// A scripted in-memory track used by [`MockMediaBackend`] and the test suite.
pub struct MockTrack {
    kind: TrackKind,
    stopped: AtomicBool,
}

impl MockTrack {
    pub fn new(kind: TrackKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            stopped: AtomicBool::new(false),
        })
    }
}

impl MediaTrack for MockTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Mock media backend for tests.
///
/// Records every track it hands out so tests can assert the resource-safety
/// invariant (all tracks stopped after close, on every path).
#[derive(Default)]
pub struct MockMediaBackend {
    fail_permission: AtomicBool,
    fail_video: AtomicBool,
    acquired: parking_lot::Mutex<Vec<Arc<MockTrack>>>,
    acquire_count: AtomicUsize,
    frame_feed: parking_lot::Mutex<Option<mpsc::UnboundedSender<Vec<f32>>>>,
}

impl MockMediaBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the backend to deny permission on the next acquire.
    pub fn deny_permission(&self) {
        self.fail_permission.store(true, Ordering::SeqCst);
    }

    /// Script the backend to fail camera acquisition after the microphone.
    pub fn fail_video(&self) {
        self.fail_video.store(true, Ordering::SeqCst);
    }

    /// All tracks ever handed out.
    pub fn tracks(&self) -> Vec<Arc<MockTrack>> {
        self.acquired.lock().clone()
    }

    /// True when every handed-out track has been stopped.
    pub fn all_tracks_stopped(&self) -> bool {
        self.acquired.lock().iter().all(|t| t.is_stopped())
    }

    /// Number of successful plus failed acquisitions attempted.
    pub fn acquire_count(&self) -> usize {
        self.acquire_count.load(Ordering::SeqCst)
    }

    /// Push a captured frame into the live session's pipeline.
    pub fn feed_frame(&self, samples: Vec<f32>) {
        if let Some(tx) = self.frame_feed.lock().as_ref() {
            let _ = tx.send(samples);
        }
    }
}

#[async_trait]
impl MediaBackend for MockMediaBackend {
    async fn acquire(&self, needs_video: bool) -> Result<MediaHandle, AcquisitionError> {
        self.acquire_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_permission.load(Ordering::SeqCst) {
            return Err(AcquisitionError::PermissionDenied(
                "microphone access denied".to_string(),
            ));
        }

        let audio = MockTrack::new(TrackKind::Audio);
        self.acquired.lock().push(audio.clone());

        let video = if needs_video {
            if self.fail_video.load(Ordering::SeqCst) {
                // Partial-acquisition contract: the microphone must not leak.
                audio.stop();
                return Err(AcquisitionError::VideoUnavailable(
                    "no camera device".to_string(),
                ));
            }
            let track = MockTrack::new(TrackKind::Video);
            self.acquired.lock().push(track.clone());
            Some(track as Arc<dyn MediaTrack>)
        } else {
            None
        };

        let (tx, rx) = mpsc::unbounded_channel();
        *self.frame_feed.lock() = Some(tx);

        Ok(MediaHandle::new(audio, video, rx, 16_000))
    }
}
