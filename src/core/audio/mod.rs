//! Bidirectional audio pipeline.
//!
//! Outbound: microphone frames are converted from f32 to 16-bit PCM, base64
//! framed, and forwarded to the live connection as they arrive. The pump
//! never blocks on the network from the capture callback's perspective; the
//! capture thread pushes into an unbounded channel and this module drains it.
//!
//! Inbound: synthesized speech chunks arrive tagged with a sample rate and
//! are scheduled gaplessly: each chunk starts exactly when the previous one
//! ends, tracked by a monotonic next-start watermark clamped to "now" when
//! playback has underrun. Capture (16kHz) and playback (24kHz) use
//! independent graphs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::media::CaptureFrames;
use crate::core::transport::{AudioChunk, LiveConnection, OutboundAudioFrame};
use crate::utils::audio::{encode_audio_frame, samples_to_pcm16};

/// Playback output owned by the embedding shell.
///
/// The sink exposes its own clock; `play_at` queues a chunk to begin at the
/// given position on that clock. A cpal- or WebAudio-backed sink maps this
/// onto its device timeline; the test sink just records the schedule.
pub trait AudioSink: Send + Sync {
    /// Queue a chunk to start playing at `start` seconds on the sink clock.
    fn play_at(&self, chunk: AudioChunk, start: f64);

    /// Current position of the sink clock in seconds.
    fn now(&self) -> f64;

    /// Stop playback and release the output graph. Idempotent.
    fn close(&self);
}

/// Gapless playback scheduling.
///
/// Maintains the monotonically advancing watermark: the next chunk starts at
/// `max(watermark, now)`, and the watermark then advances by the chunk's
/// duration. This yields no overlap and no gaps under normal jitter, and
/// recovers cleanly from underruns.
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    next_start: f64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the start time for a chunk of `duration_secs` arriving at
    /// clock position `now`, advancing the watermark.
    pub fn schedule(&mut self, duration_secs: f64, now: f64) -> f64 {
        let start = self.next_start.max(now);
        self.next_start = start + duration_secs;
        start
    }

    /// The watermark: where the next chunk would start absent an underrun.
    pub fn next_start(&self) -> f64 {
        self.next_start
    }
}

/// Converts between hardware PCM and the transport's wire audio in both
/// directions. No knowledge of sessions or personas.
pub struct AudioPipeline {
    sink: Arc<dyn AudioSink>,
    scheduler: parking_lot::Mutex<PlaybackScheduler>,
    capture_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl AudioPipeline {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            scheduler: parking_lot::Mutex::new(PlaybackScheduler::new()),
            capture_task: parking_lot::Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Start the outbound capture pump.
    ///
    /// Frames are encoded and forwarded fire-and-forget until the frame
    /// stream ends, the token is cancelled, or the connection refuses a send.
    pub fn start_capture(
        &self,
        mut frames: CaptureFrames,
        sample_rate: u32,
        connection: Arc<dyn LiveConnection>,
        cancel: CancellationToken,
    ) {
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    frame = frames.recv() => {
                        let Some(samples) = frame else { break };
                        let pcm = samples_to_pcm16(&samples);
                        let outbound = OutboundAudioFrame {
                            data: encode_audio_frame(&pcm),
                            sample_rate,
                        };
                        if let Err(e) = connection.send_audio(outbound).await {
                            tracing::debug!("Capture pump stopping: {}", e);
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Capture pump ended");
        });
        *self.capture_task.lock() = Some(task);
    }

    /// Schedule an inbound chunk for gapless playback.
    pub fn play_chunk(&self, chunk: AudioChunk) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let duration = chunk.duration_secs();
        let start = self.scheduler.lock().schedule(duration, self.sink.now());
        self.sink.play_at(chunk, start);
    }

    /// Tear down both directions: stop the capture pump and close the sink.
    /// Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.capture_task.lock().take() {
            task.abort();
        }
        self.sink.close();
        tracing::debug!("Audio pipeline closed");
    }

    /// Whether `close` has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for AudioPipeline {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Recording sink (tests and headless shells)
// =============================================================================

/// An [`AudioSink`] that records its schedule instead of producing sound.
#[derive(Default)]
pub struct RecordingSink {
    now: parking_lot::Mutex<f64>,
    scheduled: parking_lot::Mutex<Vec<(f64, f64)>>,
    closed: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Advance the sink clock.
    pub fn set_now(&self, now: f64) {
        *self.now.lock() = now;
    }

    /// `(start, duration)` pairs in scheduling order.
    pub fn schedule(&self) -> Vec<(f64, f64)> {
        self.scheduled.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl AudioSink for RecordingSink {
    fn play_at(&self, chunk: AudioChunk, start: f64) {
        self.scheduled.lock().push((start, chunk.duration_secs()));
    }

    fn now(&self) -> f64 {
        *self.now.lock()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::mpsc;

    use crate::core::transport::{TransportResult, OutboundAudioFrame};

    fn chunk(samples: usize, rate: u32) -> AudioChunk {
        AudioChunk {
            data: Bytes::from(vec![0u8; samples * 2]),
            sample_rate: rate,
        }
    }

    #[test]
    fn test_scheduler_back_to_back() {
        let mut scheduler = PlaybackScheduler::new();
        let s1 = scheduler.schedule(1.0, 0.0);
        let s2 = scheduler.schedule(0.5, 0.0);
        let s3 = scheduler.schedule(0.25, 0.0);
        assert_eq!(s1, 0.0);
        assert_eq!(s2, 1.0);
        assert_eq!(s3, 1.5);
    }

    #[test]
    fn test_scheduler_clamps_to_now_after_underrun() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.schedule(1.0, 0.0);
        // Playback drained at t=5.0; the next chunk must not start in the past.
        let start = scheduler.schedule(1.0, 5.0);
        assert_eq!(start, 5.0);
        assert_eq!(scheduler.next_start(), 6.0);
    }

    #[test]
    fn test_scheduler_invariants_under_jitter() {
        // P4: start(n+1) >= start(n) + duration(n) and start(n+1) >= now.
        let mut scheduler = PlaybackScheduler::new();
        let durations = [0.3, 0.1, 0.7, 0.2, 0.4];
        let nows = [0.0, 0.05, 0.2, 2.0, 1.5];
        let mut schedule = Vec::new();
        for (d, now) in durations.iter().zip(nows.iter()) {
            let start = scheduler.schedule(*d, *now);
            assert!(start >= *now);
            schedule.push((start, *d));
        }
        for window in schedule.windows(2) {
            let (prev_start, prev_dur) = window[0];
            let (next_start, _) = window[1];
            assert!(next_start >= prev_start + prev_dur);
        }
    }

    #[test]
    fn test_play_chunk_uses_sink_clock() {
        let sink = RecordingSink::new();
        let pipeline = AudioPipeline::new(sink.clone());

        pipeline.play_chunk(chunk(24000, 24000)); // 1s
        sink.set_now(0.2);
        pipeline.play_chunk(chunk(12000, 24000)); // 0.5s, queued behind first

        let schedule = sink.schedule();
        assert_eq!(schedule[0], (0.0, 1.0));
        assert_eq!(schedule[1], (1.0, 0.5));
    }

    #[test]
    fn test_close_is_idempotent_and_drops_late_chunks() {
        let sink = RecordingSink::new();
        let pipeline = AudioPipeline::new(sink.clone());
        pipeline.close();
        pipeline.close();
        assert!(sink.is_closed());

        pipeline.play_chunk(chunk(2400, 24000));
        assert!(sink.schedule().is_empty());
    }

    /// Connection stub that records forwarded frames.
    struct RecordingConnection {
        frames: parking_lot::Mutex<Vec<OutboundAudioFrame>>,
    }

    #[async_trait]
    impl LiveConnection for RecordingConnection {
        async fn send_audio(&self, frame: OutboundAudioFrame) -> TransportResult<()> {
            self.frames.lock().push(frame);
            Ok(())
        }
        async fn send_text(&self, _text: &str) -> TransportResult<()> {
            Ok(())
        }
        async fn send_tool_result(
            &self,
            _call_id: &str,
            _name: &str,
            _result: &str,
        ) -> TransportResult<()> {
            Ok(())
        }
        async fn close(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_capture_pump_encodes_and_forwards() {
        let sink = RecordingSink::new();
        let pipeline = AudioPipeline::new(sink);
        let connection = Arc::new(RecordingConnection {
            frames: parking_lot::Mutex::new(Vec::new()),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        pipeline.start_capture(rx, 16_000, connection.clone(), cancel.clone());

        tx.send(vec![0.5f32; 160]).unwrap();
        tx.send(vec![-0.5f32; 160]).unwrap();
        drop(tx);

        // The pump exits when the frame stream ends.
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            loop {
                if connection.frames.lock().len() == 2 {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("capture pump did not forward frames");

        let frames = connection.frames.lock();
        assert_eq!(frames[0].sample_rate, 16_000);
        let decoded = crate::utils::decode_audio_frame(&frames[0].data).unwrap();
        assert_eq!(decoded.len(), 320);
    }

    #[tokio::test]
    async fn test_capture_pump_stops_on_cancel() {
        let sink = RecordingSink::new();
        let pipeline = AudioPipeline::new(sink);
        let connection = Arc::new(RecordingConnection {
            frames: parking_lot::Mutex::new(Vec::new()),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        pipeline.start_capture(rx, 16_000, connection.clone(), cancel.clone());

        cancel.cancel();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // Frames fed after cancellation are never forwarded.
        let _ = tx.send(vec![0.1f32; 160]);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(connection.frames.lock().is_empty());
    }
}
