//! Real-time voice session orchestration core for the LiveAgent embeddable
//! website widget.
//!
//! The crate is built around one orchestrator,
//! [`session::LiveSessionController`], which opens a duplex audio session to
//! a generative model, multiplexes microphone capture out and synthesized
//! speech in, tracks turn-based transcription, dispatches model-issued tool
//! calls to application handlers, and tears down all hardware and network
//! resources deterministically on every exit path.
//!
//! Interchangeable agent personas ([`persona`]) attach different system
//! instructions, tool sets and voices to the same engine; the streaming
//! transport ([`core::transport`]) and all application collaborators
//! ([`integrations`]) sit behind traits.

pub mod config;
pub mod core;
pub mod init;
pub mod integrations;
pub mod persona;
pub mod session;
pub mod tools;
pub mod utils;

pub use config::WidgetConfig;
pub use core::transport::{GeminiLiveTransport, LiveTransport, TransportEvent};
pub use persona::{PersonaId, PersonaProfile, PersonaSettings, resolve};
pub use session::{
    LiveSessionController, SessionCallbacks, SessionError, SessionRuntime, SessionStatus,
    StartParams, TranscriptEntry,
};
