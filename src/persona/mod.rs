//! Persona resolution.
//!
//! A persona is a named configuration bundle selecting the agent's voice,
//! system instruction and available tools. [`resolve`] is a pure function
//! from persona id + settings to a [`PersonaProfile`]; it performs no I/O and
//! runs before any hardware is touched, so a configuration defect can never
//! leave a microphone acquired.

pub mod instructions;
pub mod toolset;

use std::fmt;

use thiserror::Error;

use crate::core::transport::ToolDeclaration;

pub use toolset::verify_tool_consistency;

/// Default agent display name.
pub const DEFAULT_AGENT_NAME: &str = "Elena";

/// Default prebuilt voice.
pub const DEFAULT_VOICE: &str = "Zephyr";

/// The shipped agent personas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonaId {
    /// Virtual design consultant with live video and multi-space remodeling
    RemodelingConsultant,
    /// Water damage assessment and restoration visualization
    WaterDamageRestoration,
    /// Trade-specialized troubleshooting assistant
    ContractorAgent,
    /// Sales agent parameterized by a named methodology
    SalesAgent,
    /// General customer support agent
    LiveVoiceAgent,
    /// Pay-per-call connection agent for a service vertical
    PpcAgent,
    /// Pay-per-call agent running owner-generated instructions
    CustomizablePpcAgent,
}

impl PersonaId {
    /// Parse a persona identifier.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "remodeling_consultant" => Some(PersonaId::RemodelingConsultant),
            "water_damage_restoration" => Some(PersonaId::WaterDamageRestoration),
            "contractor_agent" => Some(PersonaId::ContractorAgent),
            "sales_agent" => Some(PersonaId::SalesAgent),
            "live_voice_agent" => Some(PersonaId::LiveVoiceAgent),
            "ppc_agent" => Some(PersonaId::PpcAgent),
            "customizable_ppc_agent" => Some(PersonaId::CustomizablePpcAgent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaId::RemodelingConsultant => "remodeling_consultant",
            PersonaId::WaterDamageRestoration => "water_damage_restoration",
            PersonaId::ContractorAgent => "contractor_agent",
            PersonaId::SalesAgent => "sales_agent",
            PersonaId::LiveVoiceAgent => "live_voice_agent",
            PersonaId::PpcAgent => "ppc_agent",
            PersonaId::CustomizablePpcAgent => "customizable_ppc_agent",
        }
    }

    /// Whether this persona captures live video alongside the microphone.
    pub fn needs_video(&self) -> bool {
        matches!(
            self,
            PersonaId::RemodelingConsultant
                | PersonaId::ContractorAgent
                | PersonaId::WaterDamageRestoration
        )
    }

    /// Every shipped persona.
    pub const ALL: [PersonaId; 7] = [
        PersonaId::RemodelingConsultant,
        PersonaId::WaterDamageRestoration,
        PersonaId::ContractorAgent,
        PersonaId::SalesAgent,
        PersonaId::LiveVoiceAgent,
        PersonaId::PpcAgent,
        PersonaId::CustomizablePpcAgent,
    ];
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business-owner settings parameterizing the personas.
#[derive(Debug, Clone)]
pub struct PersonaSettings {
    /// Agent display name woven into the instruction templates
    pub agent_name: String,
    /// Prebuilt voice identifier
    pub voice_id: String,
    /// Forced literal first utterance, when set
    pub greeting_override: Option<String>,
    /// Free-text instructions appended to the template
    pub additional_instructions: Option<String>,
    /// Trade specialty for the contractor persona
    pub contractor_trade: String,
    /// Named sales methodology for the sales persona
    pub sales_style: String,
    /// Service vertical for the pay-per-call persona
    pub ppc_vertical: String,
    /// Owner-generated instructions for the customizable persona
    pub custom_instructions: Option<String>,
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            voice_id: DEFAULT_VOICE.to_string(),
            greeting_override: None,
            additional_instructions: None,
            contractor_trade: "General Contractor (GC)".to_string(),
            sales_style: instructions::SALES_STYLES[0].0.to_string(),
            ppc_vertical: instructions::PPC_VERTICALS[0].to_string(),
            custom_instructions: None,
        }
    }
}

/// A resolved persona: everything the session controller needs to open the
/// transport and wire the dispatcher.
#[derive(Debug, Clone)]
pub struct PersonaProfile {
    pub persona: PersonaId,
    pub system_instruction: String,
    pub tools: Vec<ToolDeclaration>,
    pub voice_id: String,
    pub needs_video: bool,
}

/// Persona resolution failures. All are blocking precondition failures
/// reported before any hardware is touched.
#[derive(Debug, Error)]
pub enum PersonaError {
    /// Unknown persona identifier
    #[error("Unknown persona '{0}'")]
    UnknownPersona(String),

    /// The customizable persona was selected with no generated instructions
    /// saved yet
    #[error("The custom agent has no generated instructions saved yet")]
    MissingCustomInstructions,
}

/// Resolve a persona id plus settings into a session-ready profile.
pub fn resolve(persona: PersonaId, settings: &PersonaSettings) -> Result<PersonaProfile, PersonaError> {
    let agent_name = if settings.agent_name.trim().is_empty() {
        DEFAULT_AGENT_NAME
    } else {
        settings.agent_name.trim()
    };

    let (base_instruction, tools) = match persona {
        PersonaId::RemodelingConsultant => (
            instructions::remodeling_consultant(agent_name),
            toolset::remodeling_tools(),
        ),
        PersonaId::WaterDamageRestoration => (
            instructions::water_damage_restoration(agent_name),
            toolset::water_damage_tools(),
        ),
        PersonaId::ContractorAgent => (
            instructions::contractor_agent(agent_name, &settings.contractor_trade),
            toolset::contractor_tools(),
        ),
        PersonaId::SalesAgent => {
            let style_prompt = instructions::SALES_STYLES
                .iter()
                .find(|(name, _)| *name == settings.sales_style)
                .map(|(_, prompt)| *prompt)
                .unwrap_or(instructions::SALES_STYLES[0].1);
            (
                instructions::sales_agent(agent_name, style_prompt),
                toolset::live_agent_tools(),
            )
        }
        PersonaId::LiveVoiceAgent => (
            instructions::live_voice_agent(agent_name),
            toolset::live_agent_tools(),
        ),
        PersonaId::PpcAgent => (
            instructions::ppc_agent(agent_name, &settings.ppc_vertical),
            toolset::live_agent_tools(),
        ),
        PersonaId::CustomizablePpcAgent => {
            let custom = settings
                .custom_instructions
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(PersonaError::MissingCustomInstructions)?;
            (custom.to_string(), toolset::live_agent_tools())
        }
    };

    let mut system_instruction = base_instruction;
    if let Some(greeting) = settings
        .greeting_override
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        system_instruction = instructions::with_greeting_override(greeting, &system_instruction);
    }
    if let Some(additional) = settings
        .additional_instructions
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        system_instruction =
            instructions::with_additional_instructions(&system_instruction, additional);
    }

    let voice_id = if settings.voice_id.trim().is_empty() {
        DEFAULT_VOICE.to_string()
    } else {
        settings.voice_id.trim().to_string()
    };

    Ok(PersonaProfile {
        persona,
        system_instruction,
        tools,
        voice_id,
        needs_video: persona.needs_video(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for persona in PersonaId::ALL {
            assert_eq!(PersonaId::parse(persona.as_str()), Some(persona));
        }
        assert_eq!(PersonaId::parse("unknown"), None);
    }

    #[test]
    fn test_visual_capability_profile() {
        assert!(PersonaId::RemodelingConsultant.needs_video());
        assert!(PersonaId::ContractorAgent.needs_video());
        assert!(PersonaId::WaterDamageRestoration.needs_video());
        assert!(!PersonaId::SalesAgent.needs_video());
        assert!(!PersonaId::LiveVoiceAgent.needs_video());
        assert!(!PersonaId::PpcAgent.needs_video());
    }

    #[test]
    fn test_shipped_personas_are_tool_consistent() {
        // The customizable persona runs owner text and is checked separately.
        for persona in PersonaId::ALL {
            if persona == PersonaId::CustomizablePpcAgent {
                continue;
            }
            let profile = resolve(persona, &PersonaSettings::default()).unwrap();
            if let Err(defects) =
                verify_tool_consistency(&profile.system_instruction, &profile.tools)
            {
                panic!("persona {persona} is inconsistent: {defects:?}");
            }
        }
    }

    #[test]
    fn test_customizable_requires_saved_instructions() {
        let err = resolve(PersonaId::CustomizablePpcAgent, &PersonaSettings::default())
            .unwrap_err();
        assert!(matches!(err, PersonaError::MissingCustomInstructions));

        let settings = PersonaSettings {
            custom_instructions: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(resolve(PersonaId::CustomizablePpcAgent, &settings).is_err());

        let settings = PersonaSettings {
            custom_instructions: Some("You connect plumbing calls.".to_string()),
            ..Default::default()
        };
        let profile = resolve(PersonaId::CustomizablePpcAgent, &settings).unwrap();
        assert_eq!(profile.system_instruction, "You connect plumbing calls.");
    }

    #[test]
    fn test_greeting_override_and_additions_compose() {
        let settings = PersonaSettings {
            greeting_override: Some("Thanks for calling Acme Plumbing!".to_string()),
            additional_instructions: Some("We are closed on Sundays.".to_string()),
            ..Default::default()
        };
        let profile = resolve(PersonaId::LiveVoiceAgent, &settings).unwrap();
        assert!(profile.system_instruction.starts_with("**GREETING OVERRIDE"));
        assert!(profile.system_instruction.contains("Thanks for calling Acme Plumbing!"));
        assert!(profile.system_instruction.ends_with("We are closed on Sundays."));
    }

    #[test]
    fn test_contractor_trade_parameterizes_instruction() {
        let settings = PersonaSettings {
            contractor_trade: "Electrician".to_string(),
            ..Default::default()
        };
        let profile = resolve(PersonaId::ContractorAgent, &settings).unwrap();
        assert!(profile.system_instruction.contains("specializing in Electrician"));
        assert!(profile.needs_video);
    }

    #[test]
    fn test_unknown_sales_style_falls_back() {
        let settings = PersonaSettings {
            sales_style: "Nonexistent Method".to_string(),
            ..Default::default()
        };
        let profile = resolve(PersonaId::SalesAgent, &settings).unwrap();
        assert!(profile.system_instruction.contains(instructions::SALES_STYLES[0].1));
    }

    #[test]
    fn test_blank_name_and_voice_fall_back() {
        let settings = PersonaSettings {
            agent_name: "  ".to_string(),
            voice_id: String::new(),
            ..Default::default()
        };
        let profile = resolve(PersonaId::LiveVoiceAgent, &settings).unwrap();
        assert!(profile.system_instruction.contains(DEFAULT_AGENT_NAME));
        assert_eq!(profile.voice_id, DEFAULT_VOICE);
    }
}
