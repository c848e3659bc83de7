//! Gemini Live transport implementation.

mod client;
pub mod messages;

pub use client::{
    GEMINI_LIVE_DEFAULT_MODEL, GEMINI_LIVE_URL, GEMINI_OUTPUT_SAMPLE_RATE, GeminiLiveConnection,
    GeminiLiveTransport,
};
