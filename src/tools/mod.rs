//! Tool-call execution: the bridge between model reasoning and application
//! state.
//!
//! A persona declares a set of tools; [`ToolRegistry`] maps each declared
//! name to a handler, and [`dispatcher::ToolDispatcher`] resolves every
//! model-issued invocation to exactly one spoken-result string, whatever
//! happens inside the handler.

pub mod args;
pub mod dispatcher;
pub mod handlers;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use args::ToolArgs;
pub use dispatcher::{ToolContext, ToolDispatcher, ToolHandler};

use crate::core::transport::ToolDeclaration;

/// Every tool the widget can expose to a persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    /// Full restyle of the active space from its original photo
    RemodelRoom,
    /// Small edit applied to the currently selected design
    RefineRemodelDesign,
    /// Full restyle generated from the cleaned-slate image
    RemodelCleanedRoom,
    /// Diagnose a repair problem from the provided photo
    DiagnoseProblemFromImage,
    /// Show a repair or replacement edited into the photo
    VisualizeRepair,
    /// Save the user's name and phone number as a lead
    CaptureLeadDetails,
    /// Note the user's email for the end-of-session report
    SendDesignReport,
    /// Schedule an event on the connected calendar
    CreateCalendarEvent,
    /// Begin creating a new named space
    SwitchToScanningMode,
    /// Switch the view to an existing space
    SetActiveSpace,
}

impl ToolName {
    /// All tools, in a stable order.
    pub const ALL: [ToolName; 10] = [
        ToolName::RemodelRoom,
        ToolName::RefineRemodelDesign,
        ToolName::RemodelCleanedRoom,
        ToolName::DiagnoseProblemFromImage,
        ToolName::VisualizeRepair,
        ToolName::CaptureLeadDetails,
        ToolName::SendDesignReport,
        ToolName::CreateCalendarEvent,
        ToolName::SwitchToScanningMode,
        ToolName::SetActiveSpace,
    ];

    /// Wire name the model calls the function by.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::RemodelRoom => "remodel_room",
            ToolName::RefineRemodelDesign => "refine_remodel_design",
            ToolName::RemodelCleanedRoom => "remodel_cleaned_room",
            ToolName::DiagnoseProblemFromImage => "diagnose_problem_from_image",
            ToolName::VisualizeRepair => "visualize_repair",
            ToolName::CaptureLeadDetails => "capture_lead_details",
            ToolName::SendDesignReport => "send_design_report",
            ToolName::CreateCalendarEvent => "create_calendar_event",
            ToolName::SwitchToScanningMode => "switch_to_scanning_mode",
            ToolName::SetActiveSpace => "set_active_space",
        }
    }

    /// Parse a wire name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration map from tool name to handler, built once per persona from
/// the declared tool list.
#[derive(Default)]
pub struct ToolRegistry {
    entries: HashMap<ToolName, Arc<dyn ToolHandler>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Build a registry with the built-in handler for every declared tool.
    ///
    /// A declaration whose name maps to no known tool is a configuration
    /// defect and is rejected.
    pub fn builtin_for(declarations: &[ToolDeclaration]) -> Result<Self, String> {
        let mut registry = Self::default();
        for declaration in declarations {
            let name = ToolName::parse(&declaration.name)
                .ok_or_else(|| format!("no handler registered for tool '{}'", declaration.name))?;
            registry.register(name, handlers::builtin(name));
        }
        Ok(registry)
    }

    /// Register (or replace) a handler.
    pub fn register(&mut self, name: ToolName, handler: Arc<dyn ToolHandler>) {
        self.entries.insert(name, handler);
    }

    /// Look up the handler for a wire name.
    pub fn get(&self, name: &str) -> Option<(ToolName, Arc<dyn ToolHandler>)> {
        let parsed = ToolName::parse(name)?;
        self.entries.get(&parsed).map(|h| (parsed, h.clone()))
    }

    /// Registered tool names.
    pub fn names(&self) -> Vec<ToolName> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_by_key(|n| n.as_str());
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::parse(tool.as_str()), Some(tool));
        }
        assert_eq!(ToolName::parse("remodelRoom"), None);
        assert_eq!(ToolName::parse(""), None);
    }

    #[test]
    fn test_display_matches_wire_name() {
        assert_eq!(ToolName::SetActiveSpace.to_string(), "set_active_space");
    }

    #[test]
    fn test_builtin_registry_from_declarations() {
        let declarations = vec![
            ToolDeclaration {
                name: "capture_lead_details".to_string(),
                description: String::new(),
                parameters: None,
            },
            ToolDeclaration {
                name: "set_active_space".to_string(),
                description: String::new(),
                parameters: None,
            },
        ];
        let registry = ToolRegistry::builtin_for(&declarations).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("capture_lead_details").is_some());
        assert!(registry.get("remodel_room").is_none());
    }

    #[test]
    fn test_builtin_registry_rejects_unknown_declaration() {
        let declarations = vec![ToolDeclaration {
            name: "teleport_user".to_string(),
            description: String::new(),
            parameters: None,
        }];
        let err = ToolRegistry::builtin_for(&declarations).unwrap_err();
        assert!(err.contains("teleport_user"));
    }
}
