//! Gemini Live API WebSocket message types.
//!
//! This module defines the client and server message types for the
//! `BidiGenerateContent` streaming protocol. All messages are JSON-encoded
//! and sent over WebSocket. Unlike tag-discriminated protocols, Gemini
//! messages are unions of optional top-level fields; exactly one field is
//! populated per message.
//!
//! # Protocol Overview
//!
//! Client messages (sent to server):
//! - setup - Session configuration (model, instruction, tools, voice)
//! - realtimeInput - Microphone audio chunk or out-of-band text
//! - toolResponse - Function call results
//!
//! Server messages (received from server):
//! - setupComplete - Session is ready for streaming
//! - serverContent - Synthesized audio, transcription fragments, turn state
//! - toolCall - Function call requests
//! - toolCallCancellation - Previously issued calls are void
//! - goAway - Server-initiated shutdown notice

use serde::{Deserialize, Serialize};

// =============================================================================
// Client Messages
// =============================================================================

/// Envelope for all client-to-server messages.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<Setup>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_input: Option<RealtimeInput>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_response: Option<ToolResponse>,
}

impl ClientMessage {
    /// Build a setup message.
    pub fn setup(setup: Setup) -> Self {
        Self {
            setup: Some(setup),
            ..Default::default()
        }
    }

    /// Build a realtime audio chunk message.
    pub fn audio_chunk(base64_pcm: String, sample_rate: u32) -> Self {
        Self {
            realtime_input: Some(RealtimeInput {
                media_chunks: Some(vec![MediaBlob {
                    mime_type: format!("audio/pcm;rate={sample_rate}"),
                    data: base64_pcm,
                }]),
                text: None,
            }),
            ..Default::default()
        }
    }

    /// Build an out-of-band text message.
    pub fn text(text: &str) -> Self {
        Self {
            realtime_input: Some(RealtimeInput {
                media_chunks: None,
                text: Some(text.to_string()),
            }),
            ..Default::default()
        }
    }

    /// Build a tool response for a single function call.
    pub fn tool_result(call_id: &str, name: &str, result: &str) -> Self {
        Self {
            tool_response: Some(ToolResponse {
                function_responses: vec![FunctionResponse {
                    id: call_id.to_string(),
                    name: name.to_string(),
                    response: FunctionResult {
                        result: result.to_string(),
                    },
                }],
            }),
            ..Default::default()
        }
    }
}

/// Session setup sent as the first client message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// Fully-qualified model resource name (e.g. "models/gemini-...")
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolList>>,

    /// Request transcription of inbound user audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionConfig>,

    /// Request transcription of synthesized speech
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<TranscriptionConfig>,
}

/// Generation configuration for the session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Response modalities (AUDIO for voice sessions)
    pub response_modalities: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

/// Voice selection wrapper.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

/// Prebuilt voice selection (e.g. "Zephyr", "Kore").
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Empty marker enabling a transcription stream.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranscriptionConfig {}

/// Content block carrying text parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

impl Content {
    /// Single-text-part content.
    pub fn from_text(text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.to_string()),
                inline_data: None,
            }],
        }
    }
}

/// One part of a content block: text or inline binary data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<MediaBlob>,
}

/// Inline binary payload with its MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

/// Function declarations advertised at setup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolList {
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// One declared function.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Streaming input: audio chunks or text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_chunks: Option<Vec<MediaBlob>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Tool call results returned to the model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

/// One function call result.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionResponse {
    /// Call id this result answers
    pub id: String,
    pub name: String,
    pub response: FunctionResult,
}

/// Result payload wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionResult {
    pub result: String,
}

// =============================================================================
// Server Messages
// =============================================================================

/// Envelope for all server-to-client messages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<ToolCall>,
    pub tool_call_cancellation: Option<ToolCallCancellation>,
    pub go_away: Option<serde_json::Value>,
}

/// Model output and turn state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    /// Synthesized speech and/or text parts for the current turn
    pub model_turn: Option<Content>,
    /// The current exchange unit is complete
    pub turn_complete: bool,
    /// The model's output was interrupted by user speech
    pub interrupted: bool,
    /// Incremental transcription of user audio
    pub input_transcription: Option<TranscriptionFragment>,
    /// Incremental transcription of synthesized speech
    pub output_transcription: Option<TranscriptionFragment>,
}

/// One transcription fragment.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionFragment {
    #[serde(default)]
    pub text: String,
}

/// Function call requests from the model.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub function_calls: Vec<FunctionCall>,
}

/// One requested function call.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Cancellation of previously issued calls.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallCancellation {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_chunk_wire_shape() {
        let msg = ClientMessage::audio_chunk("AAAA".to_string(), 16000);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json["realtimeInput"]["mediaChunks"][0]["mimeType"],
            "audio/pcm;rate=16000"
        );
        assert_eq!(json["realtimeInput"]["mediaChunks"][0]["data"], "AAAA");
        // Union envelope: the other variants must be absent, not null.
        assert!(json.get("setup").is_none());
        assert!(json.get("toolResponse").is_none());
    }

    #[test]
    fn test_text_wire_shape() {
        let msg = ClientMessage::text("<user_is_listening>");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["realtimeInput"]["text"], "<user_is_listening>");
        assert!(json["realtimeInput"].get("mediaChunks").is_none());
    }

    #[test]
    fn test_tool_result_wire_shape() {
        let msg = ClientMessage::tool_result("call-7", "remodel_room", "Done.");
        let json = serde_json::to_value(&msg).unwrap();
        let resp = &json["toolResponse"]["functionResponses"][0];
        assert_eq!(resp["id"], "call-7");
        assert_eq!(resp["name"], "remodel_room");
        assert_eq!(resp["response"]["result"], "Done.");
    }

    #[test]
    fn test_setup_wire_shape() {
        let setup = Setup {
            model: "models/gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: "Zephyr".to_string(),
                        },
                    },
                }),
            }),
            system_instruction: Some(Content::from_text("You are Elena.")),
            tools: Some(vec![ToolList {
                function_declarations: vec![FunctionDeclaration {
                    name: "capture_lead_details".to_string(),
                    description: "Saves a lead.".to_string(),
                    parameters: None,
                }],
            }]),
            input_audio_transcription: Some(TranscriptionConfig::default()),
            output_audio_transcription: Some(TranscriptionConfig::default()),
        };
        let json = serde_json::to_value(ClientMessage::setup(setup)).unwrap();
        assert_eq!(
            json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]
                ["prebuiltVoiceConfig"]["voiceName"],
            "Zephyr"
        );
        assert_eq!(
            json["setup"]["systemInstruction"]["parts"][0]["text"],
            "You are Elena."
        );
        assert_eq!(
            json["setup"]["tools"][0]["functionDeclarations"][0]["name"],
            "capture_lead_details"
        );
        assert!(json["setup"].get("inputAudioTranscription").is_some());
    }

    #[test]
    fn test_parse_server_content_audio() {
        let raw = r#"{
            "serverContent": {
                "modelTurn": {
                    "parts": [{"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "UUUU"}}]
                }
            }
        }"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        let content = msg.server_content.unwrap();
        assert!(!content.turn_complete);
        let part = &content.model_turn.unwrap().parts[0];
        assert_eq!(part.inline_data.as_ref().unwrap().data, "UUUU");
    }

    #[test]
    fn test_parse_server_transcriptions_and_turn() {
        let raw = r#"{
            "serverContent": {
                "inputTranscription": {"text": "he"},
                "outputTranscription": {"text": "hi"},
                "turnComplete": true
            }
        }"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        let content = msg.server_content.unwrap();
        assert_eq!(content.input_transcription.unwrap().text, "he");
        assert_eq!(content.output_transcription.unwrap().text, "hi");
        assert!(content.turn_complete);
    }

    #[test]
    fn test_parse_tool_call() {
        let raw = r#"{
            "toolCall": {
                "functionCalls": [
                    {"id": "c1", "name": "set_active_space", "args": {"space_name": "Kitchen"}}
                ]
            }
        }"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        let calls = msg.tool_call.unwrap().function_calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "set_active_space");
        assert_eq!(calls[0].args["space_name"], "Kitchen");
    }

    #[test]
    fn test_parse_unknown_fields_tolerated() {
        // Server additions must not break parsing.
        let raw = r#"{"usageMetadata": {"totalTokenCount": 12}}"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.server_content.is_none());
        assert!(msg.tool_call.is_none());
    }
}
