//! Project state: spaces, their image galleries, and session-scoped facts.
//!
//! A "space" is a user-named sub-project (one room) with its own gallery.
//! [`ProjectStore`] is the single-writer home for everything tool handlers
//! read and mutate: spaces, the active space, the selected image, captured
//! lead details, the contractor diagnosis and the water-damage report.
//! Handlers read a consistent [`ProjectSnapshot`] at invocation time since
//! the state may change while their async work is in flight.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::LeadDetails;

/// Style label of an as-captured photo.
pub const ORIGINAL_STYLE: &str = "Original";

/// Style label of the restoration persona's stripped-to-structure image.
pub const CLEANED_SLATE_STYLE: &str = "Cleaned Slate";

/// One image in a space's gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignImage {
    /// "Original", "Cleaned Slate", or a named remodel style
    pub style: String,
    /// Base64-encoded image bytes
    pub data: String,
    pub mime_type: String,
}

impl DesignImage {
    pub fn new(style: impl Into<String>, data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn is_original(&self) -> bool {
        self.style == ORIGINAL_STYLE
    }

    pub fn is_cleaned_slate(&self) -> bool {
        self.style == CLEANED_SLATE_STYLE
    }
}

/// A named sub-project holding its own gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub name: String,
    pub images: Vec<DesignImage>,
}

impl Space {
    fn new(name: impl Into<String>) -> Self {
        Self {
            id: format!("space_{}", Uuid::new_v4()),
            name: name.into(),
            images: Vec::new(),
        }
    }

    /// The as-captured photo for this space, if any.
    pub fn original_image(&self) -> Option<&DesignImage> {
        self.images.iter().find(|i| i.is_original())
    }

    /// The cleaned-slate image for this space, if any.
    pub fn cleaned_image(&self) -> Option<&DesignImage> {
        self.images.iter().find(|i| i.is_cleaned_slate())
    }
}

/// Structured water-damage assessment, as produced by the analysis model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageAnalysisReport {
    #[serde(default)]
    pub architectural_features: ArchitecturalFeatures,
    #[serde(default)]
    pub damage_assessment: DamageAssessment,
    #[serde(default)]
    pub items_to_remove: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preservation_notes: Option<String>,
}

/// Features that must be preserved during restoration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitecturalFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_dimensions: Option<String>,
    #[serde(default)]
    pub walls: Vec<String>,
    #[serde(default)]
    pub windows: Vec<String>,
    #[serde(default)]
    pub doors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceiling: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
}

/// Visible damage findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageAssessment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standing_water: Option<DamageLocations>,
    #[serde(default)]
    pub water_stains: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mold: Option<DamageLocations>,
}

/// Presence plus affected locations for one damage category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageLocations {
    pub present: bool,
    #[serde(default)]
    pub locations: Vec<String>,
}

/// One generated design-style suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSuggestion {
    pub name: String,
    pub prompt: String,
}

/// Mutable project state behind the store.
#[derive(Debug, Clone, Default)]
struct ProjectState {
    spaces: Vec<Space>,
    active_space_id: Option<String>,
    selected_image_index: Option<usize>,
    lead: LeadDetails,
    diagnosis: Option<String>,
    damage_report: Option<DamageAnalysisReport>,
    pending_space_creation: bool,
}

/// A consistent read of project state taken at tool-invocation time.
#[derive(Debug, Clone, Default)]
pub struct ProjectSnapshot {
    pub active_space: Option<Space>,
    pub lead: LeadDetails,
    pub diagnosis: Option<String>,
    pub damage_report: Option<DamageAnalysisReport>,
    pub selected_image_index: Option<usize>,
}

impl ProjectSnapshot {
    /// The active space's as-captured photo.
    pub fn original_image(&self) -> Option<&DesignImage> {
        self.active_space.as_ref().and_then(|s| s.original_image())
    }

    /// The active space's cleaned-slate image.
    pub fn cleaned_image(&self) -> Option<&DesignImage> {
        self.active_space.as_ref().and_then(|s| s.cleaned_image())
    }

    /// The currently selected design, falling back to the original photo.
    pub fn current_image(&self) -> Option<&DesignImage> {
        let space = self.active_space.as_ref()?;
        self.selected_image_index
            .and_then(|i| space.images.get(i))
            .or_else(|| space.original_image())
    }
}

/// Single-writer shared project state.
///
/// Only session callback handlers mutate it, always on the session's event
/// loop; clones share the same underlying state.
#[derive(Clone, Default)]
pub struct ProjectStore {
    state: Arc<Mutex<ProjectState>>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a consistent snapshot for a tool invocation.
    pub fn snapshot(&self) -> ProjectSnapshot {
        let state = self.state.lock();
        let active_space = state
            .active_space_id
            .as_ref()
            .and_then(|id| state.spaces.iter().find(|s| &s.id == id))
            .cloned();
        ProjectSnapshot {
            active_space,
            lead: state.lead.clone(),
            diagnosis: state.diagnosis.clone(),
            damage_report: state.damage_report.clone(),
            selected_image_index: state.selected_image_index,
        }
    }

    // -------------------------------------------------------------------------
    // Space registry
    // -------------------------------------------------------------------------

    /// Names of all spaces, in creation order.
    pub fn list_spaces(&self) -> Vec<String> {
        self.state.lock().spaces.iter().map(|s| s.name.clone()).collect()
    }

    /// Create a space and make it active. Returns its id.
    pub fn create_space(&self, name: &str) -> String {
        let mut state = self.state.lock();
        let space = Space::new(name);
        let id = space.id.clone();
        state.spaces.push(space);
        state.active_space_id = Some(id.clone());
        state.selected_image_index = None;
        state.pending_space_creation = false;
        id
    }

    /// Switch the active space by (case-insensitive) name. Returns the
    /// space's canonical name, or `None` when no such space exists.
    pub fn switch_active(&self, name: &str) -> Option<String> {
        let mut state = self.state.lock();
        let wanted = name.to_lowercase();
        let space = state
            .spaces
            .iter()
            .find(|s| s.name.to_lowercase() == wanted)
            .cloned()?;
        state.active_space_id = Some(space.id);
        state.selected_image_index = None;
        Some(space.name)
    }

    /// Mark that the user is about to name a new space.
    pub fn set_pending_space_creation(&self, pending: bool) {
        self.state.lock().pending_space_creation = pending;
    }

    pub fn is_pending_space_creation(&self) -> bool {
        self.state.lock().pending_space_creation
    }

    // -------------------------------------------------------------------------
    // Gallery
    // -------------------------------------------------------------------------

    /// Add an image to the active space, creating a first space when none
    /// exists. An `Original` image replaces any previous original (keeping
    /// generated designs) and clears stale diagnosis/report state.
    pub fn add_image(&self, image: DesignImage) {
        let mut state = self.state.lock();
        if image.is_original() {
            state.diagnosis = None;
            state.damage_report = None;
        }

        if state.active_space_id.is_none() {
            let space = Space::new("My First Space");
            state.active_space_id = Some(space.id.clone());
            state.spaces.push(space);
        }

        let active_id = state.active_space_id.clone().unwrap();
        let new_len = {
            let Some(space) = state.spaces.iter_mut().find(|s| s.id == active_id) else {
                return;
            };
            if image.is_original() {
                space.images.retain(|i| !i.is_original());
                space.images.insert(0, image);
            } else {
                space.images.push(image);
            }
            space.images.len()
        };
        state.selected_image_index = Some(new_len.saturating_sub(1));
    }

    /// Select an image in the active space's gallery.
    pub fn select_image(&self, index: Option<usize>) {
        self.state.lock().selected_image_index = index;
    }

    // -------------------------------------------------------------------------
    // Session facts
    // -------------------------------------------------------------------------

    pub fn merge_lead(&self, lead: &LeadDetails) -> LeadDetails {
        let mut state = self.state.lock();
        state.lead.merge(lead);
        state.lead.clone()
    }

    pub fn lead(&self) -> LeadDetails {
        self.state.lock().lead.clone()
    }

    pub fn set_diagnosis(&self, diagnosis: Option<String>) {
        self.state.lock().diagnosis = diagnosis;
    }

    pub fn set_damage_report(&self, report: Option<DamageAnalysisReport>) {
        self.state.lock().damage_report = report;
    }

    /// Reset everything at session end.
    pub fn clear(&self) {
        *self.state.lock() = ProjectState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn original() -> DesignImage {
        DesignImage::new(ORIGINAL_STYLE, "b64", "image/jpeg")
    }

    #[test]
    fn test_first_image_creates_a_space() {
        let store = ProjectStore::new();
        store.add_image(original());
        assert_eq!(store.list_spaces(), vec!["My First Space"]);
        let snapshot = store.snapshot();
        assert!(snapshot.original_image().is_some());
    }

    #[test]
    fn test_new_original_replaces_old_and_keeps_designs() {
        let store = ProjectStore::new();
        store.add_image(original());
        store.add_image(DesignImage::new("Modern Farmhouse", "gen", "image/png"));
        store.add_image(DesignImage::new(ORIGINAL_STYLE, "retake", "image/jpeg"));

        let snapshot = store.snapshot();
        let space = snapshot.active_space.unwrap();
        assert_eq!(space.images.len(), 2);
        assert_eq!(space.original_image().unwrap().data, "retake");
        assert!(space.images.iter().any(|i| i.style == "Modern Farmhouse"));
    }

    #[test]
    fn test_new_original_clears_stale_findings() {
        let store = ProjectStore::new();
        store.set_diagnosis(Some("leaky trap".to_string()));
        store.set_damage_report(Some(DamageAnalysisReport::default()));
        store.add_image(original());
        let snapshot = store.snapshot();
        assert!(snapshot.diagnosis.is_none());
        assert!(snapshot.damage_report.is_none());
    }

    #[test]
    fn test_switch_active_is_case_insensitive() {
        let store = ProjectStore::new();
        store.create_space("Kitchen");
        store.create_space("Master Bathroom");
        assert_eq!(store.switch_active("kitchen"), Some("Kitchen".to_string()));
        assert!(store.switch_active("garage").is_none());
    }

    #[test]
    fn test_each_space_has_its_own_gallery() {
        let store = ProjectStore::new();
        store.create_space("Kitchen");
        store.add_image(original());
        store.create_space("Bathroom");
        assert!(store.snapshot().original_image().is_none());
        store.switch_active("Kitchen").unwrap();
        assert!(store.snapshot().original_image().is_some());
    }

    #[test]
    fn test_current_image_prefers_selection() {
        let store = ProjectStore::new();
        store.add_image(original());
        store.add_image(DesignImage::new("Sleek Modern", "gen", "image/png"));
        // add_image selects the newest image.
        assert_eq!(store.snapshot().current_image().unwrap().style, "Sleek Modern");
        store.select_image(None);
        assert_eq!(store.snapshot().current_image().unwrap().style, ORIGINAL_STYLE);
    }

    #[test]
    fn test_clear_resets_everything() {
        let store = ProjectStore::new();
        store.add_image(original());
        store.merge_lead(&LeadDetails {
            name: Some("Ada".to_string()),
            ..Default::default()
        });
        store.clear();
        assert!(store.list_spaces().is_empty());
        assert_eq!(store.lead(), LeadDetails::default());
    }

    #[test]
    fn test_damage_report_round_trip() {
        let raw = r#"{
            "architectural_features": {"walls": ["drywall"], "ceiling": "flat"},
            "damage_assessment": {
                "standing_water": {"present": true, "locations": ["center"]},
                "water_stains": ["lower 2ft of drywall"],
                "mold": {"present": false}
            },
            "items_to_remove": ["soaked rug"],
            "preservation_notes": "Window frames are sound."
        }"#;
        let report: DamageAnalysisReport = serde_json::from_str(raw).unwrap();
        assert!(report.damage_assessment.standing_water.as_ref().unwrap().present);
        assert_eq!(report.items_to_remove, vec!["soaked rug"]);
        let back = serde_json::to_string(&report).unwrap();
        let reparsed: DamageAnalysisReport = serde_json::from_str(&back).unwrap();
        assert_eq!(reparsed, report);
    }
}
