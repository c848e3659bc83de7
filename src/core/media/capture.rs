//! cpal-backed microphone backend (feature `cpal-audio`).
//!
//! Captures 32-bit float audio at 16kHz mono, the transport's expected input
//! rate. The cpal stream is not `Send`, so it lives on a dedicated capture
//! thread that parks until the track is stopped; stopping drops the stream and
//! releases the device.
//!
//! This backend is microphone-only. Camera capture has no portable stack; a
//! shell that runs a visual persona supplies its own [`MediaBackend`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;

use super::{AcquisitionError, MediaBackend, MediaHandle, MediaTrack, TrackKind};

/// Capture sample rate expected by the live transport.
const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Microphone backend built on cpal.
pub struct CpalMicrophoneBackend {
    device_name: Option<String>,
}

impl CpalMicrophoneBackend {
    /// Use the host's default input device.
    pub fn new() -> Self {
        Self { device_name: None }
    }

    /// Capture from a named input device instead of the default.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    fn find_device(&self) -> Result<cpal::Device, AcquisitionError> {
        let host = cpal::default_host();
        match &self.device_name {
            Some(name) => {
                let mut devices = host.input_devices().map_err(|e| {
                    AcquisitionError::Backend(format!("failed to enumerate devices: {e}"))
                })?;
                devices
                    .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                    .ok_or_else(|| {
                        AcquisitionError::NoDevice(format!("input device '{name}' not found"))
                    })
            }
            None => host
                .default_input_device()
                .ok_or_else(|| AcquisitionError::NoDevice("no default input device".to_string())),
        }
    }
}

impl Default for CpalMicrophoneBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Live microphone track backed by a capture thread.
struct CpalAudioTrack {
    stopped: AtomicBool,
    stop_tx: std::sync::mpsc::Sender<()>,
}

impl MediaTrack for CpalAudioTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Audio
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            let _ = self.stop_tx.send(());
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaBackend for CpalMicrophoneBackend {
    async fn acquire(&self, needs_video: bool) -> Result<MediaHandle, AcquisitionError> {
        if needs_video {
            return Err(AcquisitionError::VideoUnavailable(
                "cpal backend captures audio only; supply a platform MediaBackend for visual personas"
                    .to_string(),
            ));
        }

        let device = self.find_device()?;
        let device_label = device.name().unwrap_or_else(|_| "<unknown>".to_string());

        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<Vec<f32>>();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), String>>();

        // The stream is !Send; it is created and dropped on this thread.
        std::thread::spawn(move || {
            let config = cpal::StreamConfig {
                channels: 1,
                sample_rate: cpal::SampleRate(CAPTURE_SAMPLE_RATE),
                buffer_size: cpal::BufferSize::Default,
            };

            let stream = device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Encode-and-forward only; the pipeline does the rest off
                    // the real-time callback.
                    let _ = frame_tx.send(data.to_vec());
                },
                |err| tracing::error!("Audio stream error: {}", err),
                None,
            );

            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            // Park until the track is stopped; dropping the stream releases
            // the device.
            let _ = stop_rx.recv();
            drop(stream);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(AcquisitionError::Backend(format!(
                    "failed to start capture on '{device_label}': {e}"
                )));
            }
            Err(_) => {
                return Err(AcquisitionError::Backend(
                    "capture thread exited before reporting readiness".to_string(),
                ));
            }
        }

        tracing::info!(device = %device_label, "Microphone capture started");

        let track = Arc::new(CpalAudioTrack {
            stopped: AtomicBool::new(false),
            stop_tx,
        });

        Ok(MediaHandle::new(track, None, frame_rx, CAPTURE_SAMPLE_RATE))
    }
}
