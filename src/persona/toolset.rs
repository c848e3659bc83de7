//! Per-persona tool declaration sets and the instruction/tool consistency
//! check.
//!
//! The tool set attached to a session must be the exact set its system
//! instruction references: a declared-but-unmentioned tool the model will
//! never be told how to use, and a mentioned-but-undeclared tool it cannot
//! call. [`verify_tool_consistency`] checks both directions mechanically.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::core::transport::ToolDeclaration;
use crate::tools::ToolName;

/// The full declaration, with argument schema, for one tool.
pub fn declaration(name: ToolName) -> ToolDeclaration {
    match name {
        ToolName::RemodelRoom => declare(
            name,
            "Generates a complete, new remodel design based on the user's original photo for the CURRENTLY ACTIVE space. Use this for major style changes (e.g., 'make it modern farmhouse').",
            Some(json!({
                "type": "OBJECT",
                "properties": {
                    "style_name": { "type": "STRING", "description": "The name of the design style, e.g., 'Modern Farmhouse'." },
                    "prompt": { "type": "STRING", "description": "A detailed prompt describing the style for the image generation model." }
                },
                "required": ["style_name", "prompt"]
            })),
        ),
        ToolName::RefineRemodelDesign => declare(
            name,
            "Applies a specific, small visual edit to the currently selected remodel design in the ACTIVE space. Use this for iterative changes (e.g., 'change the cabinets to blue', 'add a plant').",
            Some(json!({
                "type": "OBJECT",
                "properties": {
                    "refinement_prompt": { "type": "STRING", "description": "A clear instruction for the edit, for example: 'change the countertops to black marble'." }
                },
                "required": ["refinement_prompt"]
            })),
        ),
        ToolName::RemodelCleanedRoom => declare(
            name,
            "Generates a complete, new remodel design based on the 'cleaned slate' image of the room. Use this for major style changes (e.g., 'make it modern farmhouse').",
            Some(json!({
                "type": "OBJECT",
                "properties": {
                    "style_name": { "type": "STRING", "description": "The name of the design style, e.g., 'Modern Farmhouse'." },
                    "prompt": { "type": "STRING", "description": "A detailed prompt describing the style for the image generation model." }
                },
                "required": ["style_name", "prompt"]
            })),
        ),
        ToolName::DiagnoseProblemFromImage => declare(
            name,
            "Analyzes the user-provided image to identify potential problems, suggest causes, and determine if a professional is needed. This is the primary tool for troubleshooting.",
            Some(json!({ "type": "OBJECT", "properties": {} })),
        ),
        ToolName::VisualizeRepair => declare(
            name,
            "Generates a new image showing a potential repair or replacement. Use this when the user asks to see what a fix would look like, e.g., 'Show me what a new faucet would look like'.",
            Some(json!({
                "type": "OBJECT",
                "properties": {
                    "prompt": { "type": "STRING", "description": "A clear instruction for the visual change, for example: 'a modern, stainless steel ceiling fan'." }
                },
                "required": ["prompt"]
            })),
        ),
        ToolName::CaptureLeadDetails => declare(
            name,
            "Saves the user's name and phone number as a lead.",
            Some(json!({
                "type": "OBJECT",
                "properties": {
                    "name": { "type": "STRING", "description": "The user's full name." },
                    "phone": { "type": "STRING", "description": "The user's phone number." }
                },
                "required": ["name", "phone"]
            })),
        ),
        ToolName::SendDesignReport => declare(
            name,
            "Captures the user's email for a summary report of the session, including all spaces, designs, or diagnostic information. The email must be verbally confirmed for spelling before calling this function.",
            Some(json!({
                "type": "OBJECT",
                "properties": {
                    "email": { "type": "STRING", "description": "The user's email address." }
                },
                "required": ["email"]
            })),
        ),
        ToolName::CreateCalendarEvent => declare(
            name,
            "Schedules an event on the user's connected calendar. The calendar integration MUST be connected. Ask for all details before calling.",
            Some(json!({
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING", "description": "The title of the calendar event." },
                    "description": { "type": "STRING", "description": "A brief description of the event." },
                    "location": { "type": "STRING", "description": "The location of the event (e.g., address or video call link)." },
                    "iso_start": { "type": "STRING", "description": "The start time in ISO 8601 format (e.g., '2025-12-01T15:00:00Z')." },
                    "iso_end": { "type": "STRING", "description": "The end time in ISO 8601 format (e.g., '2025-12-01T15:30:00Z')." }
                },
                "required": ["title", "iso_start", "iso_end"]
            })),
        ),
        ToolName::SwitchToScanningMode => declare(
            name,
            "Initiates the process for the user to start designing a new space or room in their project. This will prompt the user to name the new space and then activate the camera.",
            Some(json!({ "type": "OBJECT", "properties": {} })),
        ),
        ToolName::SetActiveSpace => declare(
            name,
            "Switches the user's view to a different space they have already created within the current project. Use this if the user says something like 'let's go back to the kitchen'.",
            Some(json!({
                "type": "OBJECT",
                "properties": {
                    "space_name": { "type": "STRING", "description": "The exact name of the space to switch to, e.g., 'Kitchen'." }
                },
                "required": ["space_name"]
            })),
        ),
    }
}

fn declare(
    name: ToolName,
    description: &str,
    parameters: Option<serde_json::Value>,
) -> ToolDeclaration {
    ToolDeclaration {
        name: name.as_str().to_string(),
        description: description.to_string(),
        parameters,
    }
}

fn declarations(names: &[ToolName]) -> Vec<ToolDeclaration> {
    names.iter().map(|n| declaration(*n)).collect()
}

/// Tools for the remodeling consultant.
pub fn remodeling_tools() -> Vec<ToolDeclaration> {
    declarations(&[
        ToolName::RemodelRoom,
        ToolName::RefineRemodelDesign,
        ToolName::CaptureLeadDetails,
        ToolName::SendDesignReport,
        ToolName::CreateCalendarEvent,
        ToolName::SwitchToScanningMode,
        ToolName::SetActiveSpace,
    ])
}

/// Tools for the water damage restoration persona.
pub fn water_damage_tools() -> Vec<ToolDeclaration> {
    declarations(&[
        ToolName::RemodelCleanedRoom,
        ToolName::CaptureLeadDetails,
        ToolName::SendDesignReport,
        ToolName::CreateCalendarEvent,
        ToolName::SwitchToScanningMode,
        ToolName::SetActiveSpace,
    ])
}

/// Tools for the contractor troubleshooting persona.
pub fn contractor_tools() -> Vec<ToolDeclaration> {
    declarations(&[
        ToolName::DiagnoseProblemFromImage,
        ToolName::VisualizeRepair,
        ToolName::CaptureLeadDetails,
        ToolName::SendDesignReport,
        ToolName::CreateCalendarEvent,
    ])
}

/// Shared tools for the voice-only personas (support, sales, pay-per-call).
pub fn live_agent_tools() -> Vec<ToolDeclaration> {
    declarations(&[
        ToolName::CaptureLeadDetails,
        ToolName::SendDesignReport,
        ToolName::CreateCalendarEvent,
    ])
}

static BACKTICK_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([a-z][a-z0-9_]*)`").expect("valid regex"));

/// Check that an instruction and a tool set reference each other exactly.
///
/// Returns every defect found: tools declared but never mentioned in the
/// instruction, and tool names mentioned in the instruction but absent from
/// the declaration set. Only backticked tokens that are known tool names
/// count as references.
pub fn verify_tool_consistency(
    instruction: &str,
    tools: &[ToolDeclaration],
) -> Result<(), Vec<String>> {
    let declared: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();

    let referenced: Vec<&str> = BACKTICK_REFERENCE
        .captures_iter(instruction)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|token| ToolName::parse(token).is_some())
        .collect();

    let mut defects = Vec::new();
    for name in &declared {
        if !referenced.contains(name) {
            defects.push(format!(
                "tool '{name}' is declared but never referenced by the instruction"
            ));
        }
    }
    for name in &referenced {
        if !declared.contains(name) {
            defects.push(format!(
                "instruction references tool '{name}' which is not declared"
            ));
        }
    }

    if defects.is_empty() { Ok(()) } else { Err(defects) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_declaration_has_handler_name() {
        for tool in ToolName::ALL {
            let decl = declaration(tool);
            assert_eq!(ToolName::parse(&decl.name), Some(tool));
            assert!(!decl.description.is_empty());
        }
    }

    #[test]
    fn test_consistency_accepts_matching_pair() {
        let instruction = "Call `capture_lead_details` then `send_design_report`.";
        let tools = declarations(&[ToolName::CaptureLeadDetails, ToolName::SendDesignReport]);
        assert!(verify_tool_consistency(instruction, &tools).is_ok());
    }

    #[test]
    fn test_consistency_flags_undeclared_reference() {
        let instruction = "Use `remodel_room` for style changes.";
        let tools = declarations(&[ToolName::CaptureLeadDetails]);
        let defects = verify_tool_consistency(instruction, &tools).unwrap_err();
        assert!(defects.iter().any(|d| d.contains("'remodel_room'") && d.contains("not declared")));
    }

    #[test]
    fn test_consistency_flags_unreferenced_declaration() {
        let instruction = "Use `capture_lead_details` when appropriate.";
        let tools = declarations(&[ToolName::CaptureLeadDetails, ToolName::SetActiveSpace]);
        let defects = verify_tool_consistency(instruction, &tools).unwrap_err();
        assert!(defects.iter().any(|d| d.contains("'set_active_space'") && d.contains("never referenced")));
    }

    #[test]
    fn test_consistency_ignores_non_tool_backticks() {
        let instruction = "Say `hello` politely and call `capture_lead_details`.";
        let tools = declarations(&[ToolName::CaptureLeadDetails]);
        assert!(verify_tool_consistency(instruction, &tools).is_ok());
    }
}
