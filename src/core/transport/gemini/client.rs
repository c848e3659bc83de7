//! Gemini Live WebSocket client implementation.
//!
//! Implements the [`LiveTransport`] trait over the `BidiGenerateContent`
//! streaming endpoint.
//!
//! # API Reference
//!
//! - Endpoint: `wss://generativelanguage.googleapis.com/ws/...BidiGenerateContent?key=<api_key>`
//! - Protocol: WebSocket with JSON messages
//! - Input audio: PCM 16-bit, 16kHz, mono, little-endian, base64 encoded
//! - Output audio: PCM 16-bit, 24kHz, mono, little-endian, base64 encoded
//!
//! Transport failures are terminal for the session: the client surfaces a
//! single `Error` event followed by `Closed` and never reconnects. Restart
//! policy belongs to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use base64::prelude::*;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use super::messages::{
    ClientMessage, Content, FunctionDeclaration, GenerationConfig, PrebuiltVoiceConfig,
    ServerMessage, Setup, SpeechConfig, ToolList, TranscriptionConfig, VoiceConfig,
};
use crate::core::transport::base::{
    AudioChunk, EventSender, LiveConnection, LiveTransport, OutboundAudioFrame, SessionDescriptor,
    Speaker, ToolInvocation, TransportError, TransportEvent, TransportResult,
};

/// Default Gemini Live WebSocket endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default live model with native audio.
pub const GEMINI_LIVE_DEFAULT_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Sample rate of synthesized speech from Gemini Live.
pub const GEMINI_OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Channel capacity for outbound WebSocket messages.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Outbound routing: a protocol message or a close request.
enum Outbound {
    Message(ClientMessage),
    Close,
}

/// Gemini Live transport factory.
///
/// Holds the endpoint and API key; each [`LiveTransport::open`] call produces
/// an independent connection. The endpoint is overridable so tests can point
/// the client at a local mock server.
pub struct GeminiLiveTransport {
    endpoint: String,
    api_key: String,
}

impl GeminiLiveTransport {
    /// Create a transport against the production endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: GEMINI_LIVE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Override the WebSocket endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_url(&self) -> String {
        format!("{}?key={}", self.endpoint, self.api_key)
    }

    fn build_setup(descriptor: &SessionDescriptor) -> Setup {
        let tools = if descriptor.tools.is_empty() {
            None
        } else {
            Some(vec![ToolList {
                function_declarations: descriptor
                    .tools
                    .iter()
                    .map(|t| FunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }])
        };

        Setup {
            model: format!("models/{}", descriptor.model),
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: descriptor.voice_id.clone(),
                        },
                    },
                }),
            }),
            system_instruction: Some(Content::from_text(&descriptor.system_instruction)),
            tools,
            input_audio_transcription: descriptor
                .transcribe_input
                .then(TranscriptionConfig::default),
            output_audio_transcription: descriptor
                .transcribe_output
                .then(TranscriptionConfig::default),
        }
    }
}

#[async_trait]
impl LiveTransport for GeminiLiveTransport {
    async fn open(
        &self,
        descriptor: SessionDescriptor,
        events: EventSender,
    ) -> TransportResult<Box<dyn LiveConnection>> {
        if self.api_key.is_empty() {
            return Err(TransportError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let url = self.build_url();
        url::Url::parse(&url)
            .map_err(|e| TransportError::InvalidConfiguration(format!("bad endpoint: {e}")))?;
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        tracing::info!("Connected to Gemini Live API");

        let (mut ws_sink, mut ws_source) = ws_stream.split();
        let (tx, mut rx) = mpsc::channel::<Outbound>(WS_CHANNEL_CAPACITY);

        // The setup message must be first on the wire.
        tx.send(Outbound::Message(ClientMessage::setup(Self::build_setup(
            &descriptor,
        ))))
        .await
        .map_err(|_| TransportError::ConnectionFailed("send channel closed".to_string()))?;

        // Sender task: serialize outbound messages onto the socket.
        let sender_task = tokio::spawn(async move {
            while let Some(outbound) = rx.recv().await {
                match outbound {
                    Outbound::Message(message) => {
                        let json = match serde_json::to_string(&message) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize client message: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send WebSocket message: {}", e);
                            break;
                        }
                    }
                    Outbound::Close => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        // Receiver task: parse server messages into transport events.
        let receiver_events = events.clone();
        let receiver_task = tokio::spawn(async move {
            while let Some(msg) = ws_source.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        let parsed: ServerMessage = match serde_json::from_str(&text) {
                            Ok(m) => m,
                            Err(e) => {
                                tracing::warn!("Failed to parse server message: {}", e);
                                continue;
                            }
                        };
                        if !forward_server_message(parsed, &receiver_events).await {
                            return;
                        }
                    }
                    Ok(Message::Binary(data)) => {
                        // Some deployments frame JSON as binary.
                        let parsed: ServerMessage = match serde_json::from_slice(&data) {
                            Ok(m) => m,
                            Err(e) => {
                                tracing::warn!("Failed to parse binary server message: {}", e);
                                continue;
                            }
                        };
                        if !forward_server_message(parsed, &receiver_events).await {
                            return;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        tracing::info!("WebSocket closed by server: {:?}", frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        let _ = receiver_events
                            .send(TransportEvent::Error(TransportError::WebSocketError(
                                e.to_string(),
                            )))
                            .await;
                        break;
                    }
                }
            }
            let _ = receiver_events.send(TransportEvent::Closed).await;
        });

        Ok(Box::new(GeminiLiveConnection {
            tx,
            closed: AtomicBool::new(false),
            sender_task,
            receiver_task: parking_lot::Mutex::new(Some(receiver_task)),
        }))
    }
}

/// Map one parsed server message onto transport events.
///
/// Returns false when the event receiver is gone and the pump should stop.
async fn forward_server_message(message: ServerMessage, events: &EventSender) -> bool {
    if message.setup_complete.is_some() && events.send(TransportEvent::Opened).await.is_err() {
        return false;
    }

    if let Some(tool_call) = message.tool_call {
        for call in tool_call.function_calls {
            let invocation = ToolInvocation {
                call_id: call.id,
                name: call.name,
                args: call.args,
            };
            if events
                .send(TransportEvent::ToolCall(invocation))
                .await
                .is_err()
            {
                return false;
            }
        }
    }

    if let Some(content) = message.server_content {
        if let Some(fragment) = content.input_transcription
            && events
                .send(TransportEvent::Transcript(Speaker::User, fragment.text))
                .await
                .is_err()
        {
            return false;
        }

        if let Some(fragment) = content.output_transcription
            && events
                .send(TransportEvent::Transcript(Speaker::Model, fragment.text))
                .await
                .is_err()
        {
            return false;
        }

        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                let Some(blob) = part.inline_data else { continue };
                match BASE64_STANDARD.decode(&blob.data) {
                    Ok(pcm) => {
                        let chunk = AudioChunk {
                            data: Bytes::from(pcm),
                            sample_rate: sample_rate_from_mime(&blob.mime_type)
                                .unwrap_or(GEMINI_OUTPUT_SAMPLE_RATE),
                        };
                        if events.send(TransportEvent::Audio(chunk)).await.is_err() {
                            return false;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to decode audio chunk: {}", e);
                    }
                }
            }
        }

        if content.turn_complete && events.send(TransportEvent::TurnComplete).await.is_err() {
            return false;
        }
    }

    if message.go_away.is_some() {
        tracing::warn!("Server requested connection shutdown (goAway)");
    }

    true
}

/// Parse the sample rate out of a `audio/pcm;rate=24000` MIME type.
fn sample_rate_from_mime(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|p| p.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
}

/// One open Gemini Live connection.
pub struct GeminiLiveConnection {
    tx: mpsc::Sender<Outbound>,
    closed: AtomicBool,
    sender_task: JoinHandle<()>,
    receiver_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl GeminiLiveConnection {
    async fn send(&self, message: ClientMessage) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.tx
            .send(Outbound::Message(message))
            .await
            .map_err(|_| TransportError::NotConnected)
    }
}

#[async_trait]
impl LiveConnection for GeminiLiveConnection {
    async fn send_audio(&self, frame: OutboundAudioFrame) -> TransportResult<()> {
        self.send(ClientMessage::audio_chunk(frame.data, frame.sample_rate))
            .await
    }

    async fn send_text(&self, text: &str) -> TransportResult<()> {
        self.send(ClientMessage::text(text)).await
    }

    async fn send_tool_result(
        &self,
        call_id: &str,
        name: &str,
        result: &str,
    ) -> TransportResult<()> {
        self.send(ClientMessage::tool_result(call_id, name, result))
            .await
    }

    async fn close(&self) -> TransportResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // Ask the sender task to flush a close frame; if its channel is
        // already gone the socket is dead anyway.
        let _ = self.tx.send(Outbound::Close).await;
        if let Some(receiver) = self.receiver_task.lock().take() {
            receiver.abort();
        }
        self.sender_task.abort();
        tracing::info!("Disconnected from Gemini Live API");
        Ok(())
    }
}

impl Drop for GeminiLiveConnection {
    fn drop(&mut self) {
        if let Some(receiver) = self.receiver_task.lock().take() {
            receiver.abort();
        }
        self.sender_task.abort();
    }
}
