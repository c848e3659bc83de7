//! Widget configuration.
//!
//! One [`WidgetConfig`] is constructed per widget embed, from a YAML file
//! and/or environment variables, and passed explicitly into the session
//! runtime; the core holds no ambient settings state. Priority: YAML values,
//! then environment variables (including a `.env` file via dotenvy), then
//! defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::transport::gemini::GEMINI_LIVE_DEFAULT_MODEL;
use crate::integrations::WebhookEndpoint;
use crate::persona::{PersonaId, PersonaSettings};

/// Environment variable carrying the transport API key.
pub const API_KEY_ENV: &str = "LIVEAGENT_API_KEY";

/// Environment variable overriding the live model.
pub const MODEL_ENV: &str = "LIVEAGENT_MODEL";

/// Environment variable selecting the persona.
pub const PERSONA_ENV: &str = "LIVEAGENT_PERSONA";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Unknown persona '{0}'")]
    UnknownPersona(String),

    #[error("Missing API key: set `api_key` in the config file or {API_KEY_ENV}")]
    MissingApiKey,
}

/// Per-embed widget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Transport API key. Usually supplied via environment, not the file.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Live model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Customer identifier stamped onto webhook payloads
    #[serde(default)]
    pub customer_id: String,

    /// Selected persona identifier
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Agent display name
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Prebuilt voice identifier
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Forced literal first utterance
    #[serde(default)]
    pub greeting_override: Option<String>,

    /// Free-text instructions appended to the persona template
    #[serde(default)]
    pub additional_instructions: Option<String>,

    /// Trade specialty for the contractor persona
    #[serde(default = "default_contractor_trade")]
    pub contractor_trade: String,

    /// Named sales methodology for the sales persona
    #[serde(default = "default_sales_style")]
    pub sales_style: String,

    /// Service vertical for the pay-per-call persona
    #[serde(default = "default_ppc_vertical")]
    pub ppc_vertical: String,

    /// Owner-generated instructions for the customizable persona
    #[serde(default)]
    pub custom_instructions: Option<String>,

    /// Registered webhook endpoints
    #[serde(default)]
    pub webhooks: Vec<WebhookEndpoint>,
}

fn default_model() -> String {
    GEMINI_LIVE_DEFAULT_MODEL.to_string()
}

fn default_persona() -> String {
    PersonaId::LiveVoiceAgent.as_str().to_string()
}

fn default_agent_name() -> String {
    PersonaSettings::default().agent_name
}

fn default_voice() -> String {
    PersonaSettings::default().voice_id
}

fn default_contractor_trade() -> String {
    PersonaSettings::default().contractor_trade
}

fn default_sales_style() -> String {
    PersonaSettings::default().sales_style
}

fn default_ppc_vertical() -> String {
    PersonaSettings::default().ppc_vertical
}

impl Default for WidgetConfig {
    fn default() -> Self {
        let persona_defaults = PersonaSettings::default();
        Self {
            api_key: None,
            model: GEMINI_LIVE_DEFAULT_MODEL.to_string(),
            customer_id: String::new(),
            persona: PersonaId::LiveVoiceAgent.as_str().to_string(),
            agent_name: persona_defaults.agent_name,
            voice: persona_defaults.voice_id,
            greeting_override: None,
            additional_instructions: None,
            contractor_trade: persona_defaults.contractor_trade,
            sales_style: persona_defaults.sales_style,
            ppc_vertical: persona_defaults.ppc_vertical,
            custom_instructions: None,
            webhooks: Vec::new(),
        }
    }
}

impl WidgetConfig {
    /// Load configuration from environment variables only.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load configuration from a YAML file with environment overrides for
    /// the secret and deployment-level fields.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&raw)?;
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.is_empty()
        {
            self.api_key = Some(key);
        }
        if let Ok(model) = std::env::var(MODEL_ENV)
            && !model.is_empty()
        {
            self.model = model;
        }
        if let Ok(persona) = std::env::var(PERSONA_ENV)
            && !persona.is_empty()
        {
            self.persona = persona;
        }
    }

    /// The selected persona.
    pub fn persona_id(&self) -> Result<PersonaId, ConfigError> {
        PersonaId::parse(&self.persona)
            .ok_or_else(|| ConfigError::UnknownPersona(self.persona.clone()))
    }

    /// Persona settings derived from this configuration.
    pub fn persona_settings(&self) -> PersonaSettings {
        PersonaSettings {
            agent_name: self.agent_name.clone(),
            voice_id: self.voice.clone(),
            greeting_override: self.greeting_override.clone(),
            additional_instructions: self.additional_instructions.clone(),
            contractor_trade: self.contractor_trade.clone(),
            sales_style: self.sales_style.clone(),
            ppc_vertical: self.ppc_vertical.clone(),
            custom_instructions: self.custom_instructions.clone(),
        }
    }

    /// The API key, required to open the transport.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

/// Clear the secret from memory as soon as the config goes away.
impl Drop for WidgetConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        if let Some(ref mut key) = self.api_key {
            key.zeroize();
        }
        for endpoint in &mut self.webhooks {
            endpoint.signing_secret.zeroize();
        }
    }
}
