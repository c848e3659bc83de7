//! Application collaborators consumed by the session core.
//!
//! Everything here is an interface boundary: the orchestration layer calls
//! these traits and never cares who implements them. The crate ships the
//! webhook sink ([`webhook::WebhookSink`]) and the in-memory project state
//! ([`spaces::ProjectStore`]); generative backends, lead CRMs and calendar
//! providers are supplied by the embedding application.

pub mod spaces;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub use spaces::{
    CLEANED_SLATE_STYLE, DamageAnalysisReport, DesignImage, ORIGINAL_STYLE, ProjectSnapshot,
    ProjectStore, Space, StyleSuggestion,
};
pub use webhook::{WebhookEndpoint, WebhookSink};

/// Contact details captured as a lead during a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl LeadDetails {
    /// Overlay newly captured fields onto existing ones.
    pub fn merge(&mut self, other: &LeadDetails) {
        if other.name.is_some() {
            self.name = other.name.clone();
        }
        if other.phone.is_some() {
            self.phone = other.phone.clone();
        }
        if other.email.is_some() {
            self.email = other.email.clone();
        }
    }
}

/// A calendar event the agent wants to schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// RFC 3339 start time
    pub iso_start: String,
    /// RFC 3339 end time
    pub iso_end: String,
}

impl CalendarEventRequest {
    /// Validate timestamps before the integration is invoked: both must parse
    /// as RFC 3339 and the event must end after it starts.
    pub fn validate(&self) -> Result<(), String> {
        let start = OffsetDateTime::parse(&self.iso_start, &Rfc3339)
            .map_err(|e| format!("invalid start time '{}': {e}", self.iso_start))?;
        let end = OffsetDateTime::parse(&self.iso_end, &Rfc3339)
            .map_err(|e| format!("invalid end time '{}': {e}", self.iso_end))?;
        if end <= start {
            return Err("event end must be after its start".to_string());
        }
        Ok(())
    }
}

/// Webhook event kinds dispatched to business-owner integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEvent {
    /// The agent captured a name and phone number
    LeadCaptured,
    /// A session summary report was sent
    ReportSent,
    /// The agent scheduled a calendar event
    ConsultationScheduled,
}

impl WebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::LeadCaptured => "lead_captured",
            WebhookEvent::ReportSent => "report_sent",
            WebhookEvent::ConsultationScheduled => "consultation_scheduled",
        }
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Collaborator traits
// =============================================================================

/// Single-shot generative calls consumed by tool handlers.
///
/// Each call is one fallible request/response unit; retry policy belongs to
/// the implementation, not the session core.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Describe a room photo in one grounded sentence.
    async fn analyze_image(&self, image: &DesignImage) -> anyhow::Result<String>;

    /// Diagnose a home-repair problem from a photo.
    async fn diagnose_image(&self, image: &DesignImage) -> anyhow::Result<String>;

    /// Generate a remodel of `base` in the named style; `refine` applies a
    /// small edit instead of a full restyle.
    async fn generate_remodel(
        &self,
        style_name: &str,
        prompt: &str,
        base: &DesignImage,
        refine: bool,
    ) -> anyhow::Result<DesignImage>;

    /// Show a repair or replacement edited into `base`.
    async fn visualize_repair(
        &self,
        prompt: &str,
        base: &DesignImage,
    ) -> anyhow::Result<DesignImage>;

    /// Structured water-damage assessment of a photo.
    async fn damage_analysis(&self, image: &DesignImage) -> anyhow::Result<DamageAnalysisReport>;

    /// Generate the cleaned-slate image: the damaged room stripped to bare
    /// structure, ready for remodel generation.
    async fn generate_cleaned_image(
        &self,
        base: &DesignImage,
        report: &DamageAnalysisReport,
    ) -> anyhow::Result<DesignImage>;

    /// Full remodel generated from a cleaned-slate image.
    async fn generate_remodel_from_cleaned(
        &self,
        cleaned: &DesignImage,
        report: &DamageAnalysisReport,
        style_name: &str,
        prompt: &str,
    ) -> anyhow::Result<DesignImage>;

    /// Style suggestions fitting the room described by a damage report.
    async fn style_suggestions(
        &self,
        report: &DamageAnalysisReport,
    ) -> anyhow::Result<Vec<StyleSuggestion>>;
}

/// Lead/contact capture sink.
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn record(&self, lead: &LeadDetails) -> anyhow::Result<()>;
}

/// External calendar integration, gated on a connection flag the core checks
/// before invoking.
#[async_trait]
pub trait CalendarIntegration: Send + Sync {
    fn is_connected(&self) -> bool;
    async fn create_event(&self, event: &CalendarEventRequest) -> anyhow::Result<()>;
}

/// Fire-and-forget event notification.
///
/// `notify` must return immediately; delivery happens off the caller's path
/// and failures are the sink's problem to log.
pub trait EventSink: Send + Sync {
    fn notify(&self, event: WebhookEvent, payload: serde_json::Value);
}

/// An [`EventSink`] that drops everything. Useful for shells without
/// configured webhooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn notify(&self, event: WebhookEvent, _payload: serde_json::Value) {
        tracing::debug!(%event, "Webhook event dropped (no sink configured)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_merge_keeps_existing_fields() {
        let mut lead = LeadDetails {
            name: Some("Ada".to_string()),
            phone: Some("555-0100".to_string()),
            email: None,
        };
        lead.merge(&LeadDetails {
            name: None,
            phone: None,
            email: Some("ada@example.com".to_string()),
        });
        assert_eq!(lead.name.as_deref(), Some("Ada"));
        assert_eq!(lead.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_calendar_event_validation() {
        let mut event = CalendarEventRequest {
            title: "Consultation".to_string(),
            description: None,
            location: None,
            iso_start: "2025-12-01T15:00:00Z".to_string(),
            iso_end: "2025-12-01T15:30:00Z".to_string(),
        };
        assert!(event.validate().is_ok());

        event.iso_end = "2025-12-01T14:00:00Z".to_string();
        assert!(event.validate().unwrap_err().contains("end must be after"));

        event.iso_start = "next tuesday".to_string();
        assert!(event.validate().unwrap_err().contains("invalid start time"));
    }

    #[test]
    fn test_webhook_event_names() {
        assert_eq!(WebhookEvent::LeadCaptured.as_str(), "lead_captured");
        assert_eq!(WebhookEvent::ReportSent.to_string(), "report_sent");
        assert_eq!(
            serde_json::to_value(WebhookEvent::ConsultationScheduled).unwrap(),
            "consultation_scheduled"
        );
    }
}
