//! Live duplex streaming transport.
//!
//! The session controller consumes a transport through the [`LiveTransport`]
//! and [`LiveConnection`] traits; events arrive over a single ordered channel
//! so transcript fragments are always folded in before the turn boundary that
//! follows them. The [`gemini`] module provides the shipped implementation.

mod base;
pub mod gemini;

pub use base::{
    AudioChunk, EVENT_CHANNEL_CAPACITY, EventSender, LiveConnection, LiveTransport,
    OutboundAudioFrame, SessionDescriptor, Speaker, ToolDeclaration, ToolInvocation,
    TransportError, TransportEvent, TransportResult,
};
pub use gemini::{GEMINI_LIVE_DEFAULT_MODEL, GEMINI_OUTPUT_SAMPLE_RATE, GeminiLiveTransport};
