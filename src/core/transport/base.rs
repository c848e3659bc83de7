//! Base traits and types for live duplex streaming transports.
//!
//! A transport carries one voice session: audio frames and out-of-band text
//! flow out, synthesized speech, transcript fragments, tool calls and turn
//! boundaries flow back in. The orchestration layer consumes transports
//! exclusively through these traits; the concrete Gemini Live client lives in
//! [`super::gemini`].
//!
//! # Audio Format
//!
//! Outbound frames are PCM 16-bit signed little-endian at 16kHz, base64
//! encoded. Inbound chunks are PCM 16-bit at the sample rate tagged on each
//! chunk (24kHz for Gemini Live).

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur on the live transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection to the service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid session configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The service reported an error for the current session
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

// =============================================================================
// Session Description
// =============================================================================

/// Tool declaration advertised to the model at session setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Tool name the model calls the function by
    pub name: String,
    /// Natural-language description of when to call it
    pub description: String,
    /// JSON schema for the arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Everything a transport needs to open one live session.
///
/// Built by the session controller from a resolved persona profile; the
/// transport never sees persona identifiers.
#[derive(Debug, Clone)]
pub struct SessionDescriptor {
    /// Model identifier (e.g. "gemini-2.5-flash-native-audio-preview-09-2025")
    pub model: String,
    /// Composed system instruction text
    pub system_instruction: String,
    /// Tool declarations for function calling
    pub tools: Vec<ToolDeclaration>,
    /// Prebuilt voice identifier for speech output (e.g. "Zephyr")
    pub voice_id: String,
    /// Transcribe the user's inbound audio
    pub transcribe_input: bool,
    /// Transcribe the model's synthesized speech
    pub transcribe_output: bool,
}

// =============================================================================
// Events
// =============================================================================

/// One function call issued by the model.
///
/// Every invocation must be answered with exactly one
/// [`LiveConnection::send_tool_result`] carrying the same call id; a dropped
/// invocation stalls the model's turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Call id the result must be attributed to
    pub call_id: String,
    /// Function name
    pub name: String,
    /// Structured arguments as received from the model
    pub args: serde_json::Value,
}

/// A chunk of synthesized speech received from the model.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw audio bytes (PCM 16-bit, mono, little-endian)
    pub data: Bytes,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioChunk {
    /// Playback duration of this chunk in seconds.
    pub fn duration_secs(&self) -> f64 {
        crate::utils::pcm_duration_secs(self.data.len(), self.sample_rate)
    }
}

/// One outbound microphone frame, already in wire representation.
#[derive(Debug, Clone)]
pub struct OutboundAudioFrame {
    /// Base64-encoded PCM 16-bit little-endian samples
    pub data: String,
    /// Capture sample rate in Hz
    pub sample_rate: u32,
}

/// Speaker attribution for transcript fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The site visitor
    User,
    /// The agent
    Model,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Model => write!(f, "model"),
        }
    }
}

/// Events delivered by a transport, in stream order.
///
/// Ordering matters: transcript fragments must be folded into turn buffers
/// before a later `TurnComplete` is processed, which the single consuming
/// channel guarantees.
#[derive(Debug)]
pub enum TransportEvent {
    /// The session is open and streaming may begin
    Opened,
    /// Incremental transcript of the user's speech
    Transcript(Speaker, String),
    /// A chunk of synthesized speech to schedule for playback
    Audio(AudioChunk),
    /// The model requests a function call
    ToolCall(ToolInvocation),
    /// The current exchange unit is complete; buffered fragments commit
    TurnComplete,
    /// Terminal transport failure; no further events follow except `Closed`
    Error(TransportError),
    /// The connection is closed
    Closed,
}

/// Channel capacity for transport event delivery.
///
/// Sized for audio workloads: one event per inbound chunk plus transcript
/// fragments.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Sender half handed to a transport at open time.
pub type EventSender = mpsc::Sender<TransportEvent>;

// =============================================================================
// Traits
// =============================================================================

/// Handle to one open live session.
///
/// Owned exclusively by the session controller. All operations are
/// non-blocking from the caller's perspective; sends enqueue onto the
/// connection's outbound channel.
#[async_trait]
pub trait LiveConnection: Send + Sync {
    /// Forward one captured microphone frame.
    async fn send_audio(&self, frame: OutboundAudioFrame) -> TransportResult<()>;

    /// Inject an out-of-band text event into the conversation.
    async fn send_text(&self, text: &str) -> TransportResult<()>;

    /// Return a tool result for a previously received [`ToolInvocation`].
    async fn send_tool_result(
        &self,
        call_id: &str,
        name: &str,
        result: &str,
    ) -> TransportResult<()>;

    /// Close the connection. Idempotent.
    async fn close(&self) -> TransportResult<()>;
}

/// Factory for live sessions.
///
/// Implementations deliver all session events through the supplied channel;
/// after the receiver is dropped or the connection is closed, no further
/// events are observed by the consumer.
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Open a new session described by `descriptor`.
    async fn open(
        &self,
        descriptor: SessionDescriptor,
        events: EventSender,
    ) -> TransportResult<Box<dyn LiveConnection>>;
}
