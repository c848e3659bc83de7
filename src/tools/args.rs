//! Typed tool-call arguments.
//!
//! The model sends loosely-typed JSON argument payloads; this module converts
//! them into a tagged union per tool with validated required fields, so a
//! missing argument surfaces as an explicit, reportable error instead of a
//! silent default deep inside a handler.

use serde_json::Value;

use super::ToolName;
use crate::integrations::CalendarEventRequest;

/// Validated arguments for one tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArgs {
    RemodelRoom {
        style_name: String,
        prompt: String,
    },
    RefineRemodelDesign {
        refinement_prompt: String,
    },
    RemodelCleanedRoom {
        style_name: String,
        prompt: String,
    },
    DiagnoseProblemFromImage,
    VisualizeRepair {
        prompt: String,
    },
    CaptureLeadDetails {
        name: String,
        phone: String,
    },
    SendDesignReport {
        email: String,
    },
    CreateCalendarEvent(CalendarEventRequest),
    SwitchToScanningMode,
    SetActiveSpace {
        space_name: String,
    },
}

impl ToolArgs {
    /// Parse and validate the raw argument payload for `tool`.
    pub fn parse(tool: ToolName, args: &Value) -> Result<Self, String> {
        match tool {
            ToolName::RemodelRoom => Ok(ToolArgs::RemodelRoom {
                style_name: required_str(args, "style_name")?,
                prompt: required_str(args, "prompt")?,
            }),
            ToolName::RefineRemodelDesign => Ok(ToolArgs::RefineRemodelDesign {
                refinement_prompt: required_str(args, "refinement_prompt")?,
            }),
            ToolName::RemodelCleanedRoom => Ok(ToolArgs::RemodelCleanedRoom {
                style_name: required_str(args, "style_name")?,
                prompt: required_str(args, "prompt")?,
            }),
            ToolName::DiagnoseProblemFromImage => Ok(ToolArgs::DiagnoseProblemFromImage),
            ToolName::VisualizeRepair => Ok(ToolArgs::VisualizeRepair {
                prompt: required_str(args, "prompt")?,
            }),
            ToolName::CaptureLeadDetails => Ok(ToolArgs::CaptureLeadDetails {
                name: required_str(args, "name")?,
                phone: required_str(args, "phone")?,
            }),
            ToolName::SendDesignReport => Ok(ToolArgs::SendDesignReport {
                email: required_str(args, "email")?,
            }),
            ToolName::CreateCalendarEvent => Ok(ToolArgs::CreateCalendarEvent(
                CalendarEventRequest {
                    title: required_str(args, "title")?,
                    description: optional_str(args, "description"),
                    location: optional_str(args, "location"),
                    iso_start: required_str(args, "iso_start")?,
                    iso_end: required_str(args, "iso_end")?,
                },
            )),
            ToolName::SwitchToScanningMode => Ok(ToolArgs::SwitchToScanningMode),
            ToolName::SetActiveSpace => Ok(ToolArgs::SetActiveSpace {
                space_name: required_str(args, "space_name")?,
            }),
        }
    }
}

fn required_str(args: &Value, key: &str) -> Result<String, String> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(format!("required argument '{key}' is empty")),
        Some(other) => Err(format!(
            "required argument '{key}' has wrong type (got {other})"
        )),
        None => Err(format!("required argument '{key}' is missing")),
    }
}

fn optional_str(args: &Value, key: &str) -> Option<String> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}
