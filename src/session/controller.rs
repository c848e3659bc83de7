//! The live session orchestrator.
//!
//! [`LiveSessionController`] owns at most one active session at a time: it
//! acquires media, opens the transport, wires the audio pipeline, transcript
//! accumulator and tool dispatcher to the transport's event stream, and tears
//! everything down deterministically on every exit path.
//!
//! Lifecycle: `Inactive -> Connecting -> Active -> Inactive` on a normal
//! close, and `Connecting|Active -> Error -> Inactive` on failure. No
//! transition skips teardown. Transport errors are terminal for the session;
//! the caller decides whether to call `start` again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;

use super::transcript::TranscriptAccumulator;
use super::{SessionCallbacks, SessionError, SessionStatus, StartParams};
use crate::core::audio::{AudioPipeline, AudioSink};
use crate::core::media::{CaptureFrames, MediaBackend, MediaCaptureManager, MediaHandle};
use crate::core::transport::{
    EVENT_CHANNEL_CAPACITY, LiveConnection, LiveTransport, SessionDescriptor, ToolInvocation,
    TransportEvent,
};
use crate::integrations::{
    CalendarIntegration, DesignImage, EventSink, GenerativeBackend, LeadSink, ProjectStore,
    StyleSuggestion,
};
use crate::persona::PersonaId;
use crate::tools::{ToolContext, ToolDispatcher, ToolRegistry};

/// Synthetic text event sent once the transport opens, so the agent knows it
/// may speak first.
pub const LISTENING_SIGNAL: &str = "<user_is_listening>";

/// Factory producing a fresh playback sink per session.
pub type SinkFactory = Arc<dyn Fn() -> Arc<dyn AudioSink> + Send + Sync>;

/// Everything the controller needs injected once per widget embed.
pub struct SessionRuntime {
    pub transport: Arc<dyn LiveTransport>,
    pub media_backend: Arc<dyn MediaBackend>,
    pub make_sink: SinkFactory,
    pub project: ProjectStore,
    pub backend: Arc<dyn GenerativeBackend>,
    pub leads: Arc<dyn LeadSink>,
    pub calendar: Arc<dyn CalendarIntegration>,
    pub events: Arc<dyn EventSink>,
    /// Live model identifier passed to the transport
    pub model: String,
}

/// Resources owned by one open session.
struct ActiveSession {
    persona: PersonaId,
    connection: Arc<dyn LiveConnection>,
    pipeline: Arc<AudioPipeline>,
    media: MediaHandle,
    cancel: CancellationToken,
    pump: Option<JoinHandle<()>>,
    tool_tasks: Arc<DashMap<String, AbortHandle>>,
}

struct ControllerInner {
    transport: Arc<dyn LiveTransport>,
    media: MediaCaptureManager,
    make_sink: SinkFactory,
    project: ProjectStore,
    backend: Arc<dyn GenerativeBackend>,
    leads: Arc<dyn LeadSink>,
    calendar: Arc<dyn CalendarIntegration>,
    events: Arc<dyn EventSink>,
    model: String,

    status: parking_lot::Mutex<SessionStatus>,
    callbacks: parking_lot::Mutex<SessionCallbacks>,
    session: tokio::sync::Mutex<Option<ActiveSession>>,
    close_requested: AtomicBool,
}

impl ControllerInner {
    fn set_status(&self, status: SessionStatus) {
        let changed = {
            let mut current = self.status.lock();
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        };
        if changed {
            tracing::info!(%status, "Session status changed");
            let callbacks = self.callbacks.lock().clone();
            (callbacks.on_status)(status);
        }
    }

    /// Release every resource of `session`. The single teardown path shared
    /// by `close()`, failed starts, and the pump's terminal-error exit.
    async fn shutdown_session(&self, mut session: ActiveSession, await_pump: bool) {
        session.cancel.cancel();

        for entry in session.tool_tasks.iter() {
            entry.value().abort();
        }
        session.tool_tasks.clear();

        if let Err(e) = session.connection.close().await {
            tracing::debug!("Transport close reported: {}", e);
        }
        session.pipeline.close();
        self.media.release(&mut session.media);
        self.project.clear();

        if await_pump && let Some(pump) = session.pump.take() {
            // The pump observes the cancelled token at its next iteration; by
            // the time this returns no further transport event is processed.
            let _ = pump.await;
        }
    }
}

/// Single entry/exit point for a voice session's lifecycle; the only
/// component that holds the transport connection.
pub struct LiveSessionController {
    inner: Arc<ControllerInner>,
}

impl LiveSessionController {
    pub fn new(runtime: SessionRuntime) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                transport: runtime.transport,
                media: MediaCaptureManager::new(runtime.media_backend),
                make_sink: runtime.make_sink,
                project: runtime.project,
                backend: runtime.backend,
                leads: runtime.leads,
                calendar: runtime.calendar,
                events: runtime.events,
                model: runtime.model,
                status: parking_lot::Mutex::new(SessionStatus::Inactive),
                callbacks: parking_lot::Mutex::new(SessionCallbacks::noop()),
                session: tokio::sync::Mutex::new(None),
                close_requested: AtomicBool::new(false),
            }),
        }
    }

    /// Current session status.
    pub fn status(&self) -> SessionStatus {
        *self.inner.status.lock()
    }

    /// The project state shared with tool handlers.
    pub fn project(&self) -> &ProjectStore {
        &self.inner.project
    }

    /// Start a session for a resolved persona profile.
    ///
    /// Rejects with [`SessionError::AlreadyActive`] unless the controller is
    /// `Inactive`. On any failure during the start sequence, every
    /// partially-acquired resource is released before the error is reported.
    pub async fn start(&self, params: StartParams) -> Result<(), SessionError> {
        {
            let mut status = self.inner.status.lock();
            if *status != SessionStatus::Inactive {
                return Err(SessionError::AlreadyActive);
            }
            *status = SessionStatus::Connecting;
        }
        self.inner.close_requested.store(false, Ordering::SeqCst);
        *self.inner.callbacks.lock() = params.callbacks.clone();
        {
            let callbacks = self.inner.callbacks.lock().clone();
            (callbacks.on_status)(SessionStatus::Connecting);
        }
        tracing::info!(persona = %params.profile.persona, "Starting live session");

        match self.start_inner(params).await {
            Ok(()) => Ok(()),
            Err(SessionError::Cancelled) => {
                // The user closed while the start sequence was in flight; not
                // a failure from their point of view.
                self.inner.set_status(SessionStatus::Inactive);
                Err(SessionError::Cancelled)
            }
            Err(e) => {
                // Error status is observable, then the controller settles at
                // Inactive so the caller can retry cleanly.
                self.inner.set_status(SessionStatus::Error);
                self.inner.set_status(SessionStatus::Inactive);
                Err(e)
            }
        }
    }

    async fn start_inner(&self, params: StartParams) -> Result<(), SessionError> {
        let inner = &self.inner;
        let profile = params.profile;

        // Tool registry mismatches are configuration defects; fail before any
        // hardware is touched.
        let registry = ToolRegistry::builtin_for(&profile.tools)
            .map_err(SessionError::Configuration)?;

        let mut media = inner.media.acquire(profile.needs_video).await?;
        if inner.close_requested.load(Ordering::SeqCst) {
            inner.media.release(&mut media);
            return Err(SessionError::Cancelled);
        }

        if let Some(surface) = params.video_surface {
            inner.media.bind(&mut media, surface);
        }

        let frames = media.take_frames();
        let capture_rate = media.capture_sample_rate();

        let descriptor = SessionDescriptor {
            model: inner.model.clone(),
            system_instruction: profile.system_instruction.clone(),
            tools: profile.tools.clone(),
            voice_id: profile.voice_id.clone(),
            transcribe_input: true,
            transcribe_output: true,
        };

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let connection: Arc<dyn LiveConnection> =
            match inner.transport.open(descriptor, event_tx).await {
                Ok(connection) => Arc::from(connection),
                Err(e) => {
                    inner.media.release(&mut media);
                    return Err(SessionError::Transport(e));
                }
            };

        if inner.close_requested.load(Ordering::SeqCst) {
            let _ = connection.close().await;
            inner.media.release(&mut media);
            return Err(SessionError::Cancelled);
        }

        let dispatcher = Arc::new(ToolDispatcher::new(
            registry,
            Arc::new(ToolContext {
                project: inner.project.clone(),
                backend: inner.backend.clone(),
                leads: inner.leads.clone(),
                calendar: inner.calendar.clone(),
                events: inner.events.clone(),
            }),
        ));

        let pipeline = Arc::new(AudioPipeline::new((inner.make_sink)()));
        let cancel = CancellationToken::new();
        let tool_tasks: Arc<DashMap<String, AbortHandle>> = Arc::new(DashMap::new());

        let pump = tokio::spawn(pump_events(PumpContext {
            inner: self.inner.clone(),
            events: event_rx,
            cancel: cancel.clone(),
            connection: connection.clone(),
            pipeline: pipeline.clone(),
            dispatcher,
            tool_tasks: tool_tasks.clone(),
            frames,
            capture_rate,
        }));

        *inner.session.lock().await = Some(ActiveSession {
            persona: profile.persona,
            connection,
            pipeline,
            media,
            cancel,
            pump: Some(pump),
            tool_tasks,
        });

        // A close that raced the start sequence wins; undo everything.
        if inner.close_requested.load(Ordering::SeqCst) {
            if let Some(session) = inner.session.lock().await.take() {
                inner.shutdown_session(session, true).await;
            }
            return Err(SessionError::Cancelled);
        }

        Ok(())
    }

    /// Close the active session, releasing all resources.
    ///
    /// Idempotent: closing an inactive controller is a no-op. Callable from
    /// any state, including mid-`Connecting`. By the time it returns, no
    /// further transport events are processed and no hardware track remains
    /// live.
    pub async fn close(&self) {
        self.inner.close_requested.store(true, Ordering::SeqCst);

        let session = self.inner.session.lock().await.take();
        match session {
            Some(session) => {
                tracing::info!("Closing live session");
                self.inner.shutdown_session(session, true).await;
                self.inner.set_status(SessionStatus::Inactive);
            }
            None => {
                // Either never started, still mid-start (the start sequence
                // observes the flag and rolls itself back), or already torn
                // down by the pump's error path.
                if self.status() == SessionStatus::Active {
                    self.inner.set_status(SessionStatus::Inactive);
                }
            }
        }
    }

    /// Feed a captured or uploaded photo into the active session.
    ///
    /// What happens depends on the persona:
    /// - water damage restoration runs the automated pipeline: damage
    ///   analysis, cleaned-slate generation, style suggestions, with the
    ///   agent kept informed through system messages;
    /// - the contractor assistant stores the photo and instructs the agent
    ///   to run its diagnosis tool;
    /// - the remodeling consultant stores the photo and hands the agent a
    ///   grounded analysis of it.
    ///
    /// Returns style suggestions when the persona produces them. Generation
    /// failures are reported to the caller and never end the session.
    pub async fn ingest_photo(
        &self,
        image: DesignImage,
    ) -> Result<Vec<StyleSuggestion>, SessionError> {
        if self.status() != SessionStatus::Active {
            return Err(SessionError::NotActive);
        }
        let persona = {
            let guard = self.inner.session.lock().await;
            guard.as_ref().ok_or(SessionError::NotActive)?.persona
        };
        let inner = &self.inner;

        match persona {
            PersonaId::WaterDamageRestoration => {
                self.send_system_message(
                    "(System: The user has provided a photo. You must inform them the automated analysis and cleanup visualization process is starting and will take up to a minute.)",
                )
                .await?;

                let report = inner
                    .backend
                    .damage_analysis(&image)
                    .await
                    .map_err(|e| SessionError::Generation(format!("damage analysis: {e:#}")))?;
                let cleaned = inner
                    .backend
                    .generate_cleaned_image(&image, &report)
                    .await
                    .map_err(|e| SessionError::Generation(format!("cleaned slate: {e:#}")))?;

                inner.project.add_image(image);
                inner.project.set_damage_report(Some(report.clone()));
                inner.project.add_image(cleaned);

                self.send_system_message(
                    "(System: The automated analysis and 'cleaned slate' visualization are complete. You must now inform the user and guide them into the remodeling phase.)",
                )
                .await?;

                match inner.backend.style_suggestions(&report).await {
                    Ok(suggestions) => Ok(suggestions),
                    Err(e) => {
                        tracing::warn!("Style suggestion generation failed: {:#}", e);
                        Ok(Vec::new())
                    }
                }
            }
            PersonaId::ContractorAgent => {
                inner.project.add_image(image);
                self.send_system_message(
                    "(System: The user has provided a photo for troubleshooting. Advise the user you are analyzing the image and then immediately call the 'diagnose_problem_from_image' tool to begin.)",
                )
                .await?;
                Ok(Vec::new())
            }
            PersonaId::RemodelingConsultant => {
                inner.project.add_image(image.clone());
                let space_name = inner
                    .project
                    .snapshot()
                    .active_space
                    .map(|s| s.name)
                    .unwrap_or_else(|| "current".to_string());
                let analysis = inner
                    .backend
                    .analyze_image(&image)
                    .await
                    .map_err(|e| SessionError::Generation(format!("image analysis: {e:#}")))?;
                self.send_system_message(&format!(
                    "(System: The user has captured a photo for the '{space_name}' space. Here is an analysis of the image: {analysis})"
                ))
                .await?;
                Ok(Vec::new())
            }
            _ => {
                tracing::warn!(%persona, "Photo ignored for voice-only persona");
                Ok(Vec::new())
            }
        }
    }

    /// Inject an out-of-band text event into the active session.
    ///
    /// Used to hand the agent contextual information generated by the
    /// surrounding application (e.g. "image analysis complete: ...").
    pub async fn send_system_message(&self, text: &str) -> Result<(), SessionError> {
        if self.status() != SessionStatus::Active {
            return Err(SessionError::NotActive);
        }
        let guard = self.inner.session.lock().await;
        let Some(session) = guard.as_ref() else {
            return Err(SessionError::NotActive);
        };
        session
            .connection
            .send_text(text)
            .await
            .map_err(SessionError::Transport)
    }
}

/// State moved into the event pump task.
struct PumpContext {
    inner: Arc<ControllerInner>,
    events: mpsc::Receiver<TransportEvent>,
    cancel: CancellationToken,
    connection: Arc<dyn LiveConnection>,
    pipeline: Arc<AudioPipeline>,
    dispatcher: Arc<ToolDispatcher>,
    tool_tasks: Arc<DashMap<String, AbortHandle>>,
    frames: Option<CaptureFrames>,
    capture_rate: u32,
}

/// Consume transport events until the session ends.
///
/// The `biased` select checks cancellation first, so once `close()` has
/// cancelled the token no already-queued event is processed.
async fn pump_events(mut ctx: PumpContext) {
    let mut accumulator = TranscriptAccumulator::new();
    let mut terminal_error = false;

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::debug!("Event pump cancelled");
                return;
            }
            event = ctx.events.recv() => {
                let Some(event) = event else { break };
                match event {
                    TransportEvent::Opened => {
                        ctx.inner.set_status(SessionStatus::Active);
                        if let Err(e) = ctx.connection.send_text(LISTENING_SIGNAL).await {
                            tracing::warn!("Failed to send listening signal: {}", e);
                        }
                        if let Some(frames) = ctx.frames.take() {
                            ctx.pipeline.start_capture(
                                frames,
                                ctx.capture_rate,
                                ctx.connection.clone(),
                                ctx.cancel.child_token(),
                            );
                        }
                    }
                    TransportEvent::Transcript(speaker, delta) => {
                        let update = accumulator.on_fragment(speaker, &delta);
                        let callbacks = ctx.inner.callbacks.lock().clone();
                        (callbacks.on_transcript_update)(update);
                    }
                    TransportEvent::Audio(chunk) => {
                        ctx.pipeline.play_chunk(chunk);
                    }
                    TransportEvent::ToolCall(invocation) => {
                        spawn_tool_call(&ctx, invocation);
                    }
                    TransportEvent::TurnComplete => {
                        let committed = accumulator.on_turn_complete();
                        let callbacks = ctx.inner.callbacks.lock().clone();
                        if !committed.is_empty() {
                            (callbacks.on_turn_committed)(committed);
                        }
                        (callbacks.on_transcript_update)(accumulator.pending());
                    }
                    TransportEvent::Error(e) => {
                        tracing::error!("Terminal transport error: {}", e);
                        terminal_error = true;
                        break;
                    }
                    TransportEvent::Closed => {
                        tracing::info!("Transport closed");
                        break;
                    }
                }
            }
        }
    }

    // Remote-initiated end (error or server close). A user-initiated close
    // cancels the token and never reaches this path, so teardown cannot run
    // twice against an active session.
    if terminal_error {
        ctx.inner.set_status(SessionStatus::Error);
    }
    if let Some(session) = ctx.inner.session.lock().await.take() {
        ctx.inner.shutdown_session(session, false).await;
    }
    ctx.inner.set_status(SessionStatus::Inactive);
}

/// Run one tool invocation concurrently; every invocation is answered with
/// exactly one `(call_id, result)` pair whatever the handler does.
fn spawn_tool_call(ctx: &PumpContext, invocation: ToolInvocation) {
    let dispatcher = ctx.dispatcher.clone();
    let connection = ctx.connection.clone();
    let tool_tasks = ctx.tool_tasks.clone();
    let call_id = invocation.call_id.clone();

    let task = tokio::spawn(async move {
        let result = dispatcher.dispatch(&invocation).await;
        if let Err(e) = connection
            .send_tool_result(&invocation.call_id, &invocation.name, &result)
            .await
        {
            tracing::warn!(call_id = %invocation.call_id, "Failed to return tool result: {}", e);
        }
        tool_tasks.remove(&invocation.call_id);
    });
    ctx.tool_tasks.insert(call_id, task.abort_handle());
}
