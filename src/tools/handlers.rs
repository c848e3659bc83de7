//! Built-in tool handlers.
//!
//! Each handler performs exactly one logical action against the collaborators
//! in [`ToolContext`] and returns the sentence the agent speaks back. Failed
//! preconditions return explanatory sentences, not errors; the state they
//! check is read as one snapshot at invocation time because it may change
//! while a slow generation call is in flight.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::ToolName;
use super::args::ToolArgs;
use super::dispatcher::{ToolContext, ToolHandler};
use crate::integrations::{DesignImage, LeadDetails, WebhookEvent};

/// The built-in handler for a tool name.
pub fn builtin(name: ToolName) -> Arc<dyn ToolHandler> {
    match name {
        ToolName::RemodelRoom => Arc::new(RemodelRoom),
        ToolName::RefineRemodelDesign => Arc::new(RefineRemodelDesign),
        ToolName::RemodelCleanedRoom => Arc::new(RemodelCleanedRoom),
        ToolName::DiagnoseProblemFromImage => Arc::new(DiagnoseProblemFromImage),
        ToolName::VisualizeRepair => Arc::new(VisualizeRepair),
        ToolName::CaptureLeadDetails => Arc::new(CaptureLeadDetails),
        ToolName::SendDesignReport => Arc::new(SendDesignReport),
        ToolName::CreateCalendarEvent => Arc::new(CreateCalendarEvent),
        ToolName::SwitchToScanningMode => Arc::new(SwitchToScanningMode),
        ToolName::SetActiveSpace => Arc::new(SetActiveSpace),
    }
}

struct RemodelRoom;

#[async_trait]
impl ToolHandler for RemodelRoom {
    async fn handle(&self, args: ToolArgs, ctx: &ToolContext) -> anyhow::Result<String> {
        let ToolArgs::RemodelRoom { style_name, prompt } = args else {
            anyhow::bail!("argument variant mismatch");
        };
        let snapshot = ctx.project.snapshot();
        let Some(original) = snapshot.original_image().cloned() else {
            return Ok("Please capture a photo for this space first.".to_string());
        };

        match ctx
            .backend
            .generate_remodel(&style_name, &prompt, &original, false)
            .await
        {
            Ok(image) => {
                ctx.project.add_image(image);
                Ok(format!(
                    "OK, I've created the {style_name} design for you. Take a look."
                ))
            }
            Err(e) => {
                tracing::error!("Remodel generation failed: {:#}", e);
                Ok("Sorry, I had trouble creating that design style.".to_string())
            }
        }
    }
}

struct RefineRemodelDesign;

#[async_trait]
impl ToolHandler for RefineRemodelDesign {
    async fn handle(&self, args: ToolArgs, ctx: &ToolContext) -> anyhow::Result<String> {
        let ToolArgs::RefineRemodelDesign { refinement_prompt } = args else {
            anyhow::bail!("argument variant mismatch");
        };
        let snapshot = ctx.project.snapshot();
        let Some(current) = snapshot.current_image().cloned() else {
            return Ok("Please select a design to refine first.".to_string());
        };

        match ctx
            .backend
            .generate_remodel("Refined", &refinement_prompt, &current, true)
            .await
        {
            Ok(image) => {
                ctx.project.add_image(image);
                Ok("OK, I've applied that refinement for you. Take a look.".to_string())
            }
            Err(e) => {
                tracing::error!("Refinement generation failed: {:#}", e);
                Ok("Sorry, I had trouble creating that design style.".to_string())
            }
        }
    }
}

struct RemodelCleanedRoom;

#[async_trait]
impl ToolHandler for RemodelCleanedRoom {
    async fn handle(&self, args: ToolArgs, ctx: &ToolContext) -> anyhow::Result<String> {
        let ToolArgs::RemodelCleanedRoom { style_name, prompt } = args else {
            anyhow::bail!("argument variant mismatch");
        };
        let snapshot = ctx.project.snapshot();
        let (Some(cleaned), Some(report)) =
            (snapshot.cleaned_image().cloned(), snapshot.damage_report.clone())
        else {
            return Ok(
                "I can't generate a remodel yet; the cleaned-up visualization and damage report need to be ready first."
                    .to_string(),
            );
        };

        match ctx
            .backend
            .generate_remodel_from_cleaned(&cleaned, &report, &style_name, &prompt)
            .await
        {
            Ok(image) => {
                ctx.project.add_image(image);
                Ok(format!(
                    "OK, I've created the {style_name} design for you. What do you think?"
                ))
            }
            Err(e) => {
                tracing::error!("Cleaned-room remodel failed: {:#}", e);
                Ok("Sorry, I had trouble creating that new design.".to_string())
            }
        }
    }
}

struct DiagnoseProblemFromImage;

#[async_trait]
impl ToolHandler for DiagnoseProblemFromImage {
    async fn handle(&self, _args: ToolArgs, ctx: &ToolContext) -> anyhow::Result<String> {
        let snapshot = ctx.project.snapshot();
        let Some(original) = snapshot.original_image().cloned() else {
            return Ok(
                "I can't diagnose the problem without a photo. Please provide one first."
                    .to_string(),
            );
        };

        let diagnosis = ctx.backend.diagnose_image(&original).await?;
        ctx.project.set_diagnosis(Some(diagnosis.clone()));
        Ok(format!(
            "(System: The diagnosis is complete. The result is: \"{diagnosis}\". You must now discuss these findings with the user.)"
        ))
    }
}

struct VisualizeRepair;

#[async_trait]
impl ToolHandler for VisualizeRepair {
    async fn handle(&self, args: ToolArgs, ctx: &ToolContext) -> anyhow::Result<String> {
        let ToolArgs::VisualizeRepair { prompt } = args else {
            anyhow::bail!("argument variant mismatch");
        };
        let snapshot = ctx.project.snapshot();
        let Some(current) = snapshot.current_image().cloned() else {
            return Ok("Please provide a photo before I can visualize a repair.".to_string());
        };

        match ctx.backend.visualize_repair(&prompt, &current).await {
            Ok(image) => {
                ctx.project.add_image(relabel_repair(image, &prompt));
                Ok("OK, I've generated an image of that for you. What do you think?".to_string())
            }
            Err(e) => {
                tracing::error!("Repair visualization failed: {:#}", e);
                Ok("Sorry, I had trouble creating that image.".to_string())
            }
        }
    }
}

/// Label a repair visualization by its request, truncated for gallery display.
fn relabel_repair(mut image: DesignImage, prompt: &str) -> DesignImage {
    let short: String = prompt.chars().take(20).collect();
    image.style = if prompt.chars().count() > 20 {
        format!("Repair: {short}...")
    } else {
        format!("Repair: {short}")
    };
    image
}

struct CaptureLeadDetails;

#[async_trait]
impl ToolHandler for CaptureLeadDetails {
    async fn handle(&self, args: ToolArgs, ctx: &ToolContext) -> anyhow::Result<String> {
        let ToolArgs::CaptureLeadDetails { name, phone } = args else {
            anyhow::bail!("argument variant mismatch");
        };
        let lead = LeadDetails {
            name: Some(name.clone()),
            phone: Some(phone.clone()),
            email: None,
        };
        let merged = ctx.project.merge_lead(&lead);

        if let Err(e) = ctx.leads.record(&merged).await {
            tracing::warn!("Lead sink rejected record: {:#}", e);
        }
        ctx.events.notify(
            WebhookEvent::LeadCaptured,
            json!({ "event_type": "details_provided", "name": name, "phone": phone }),
        );

        Ok("Thank you, I've got that down.".to_string())
    }
}

struct SendDesignReport;

#[async_trait]
impl ToolHandler for SendDesignReport {
    async fn handle(&self, args: ToolArgs, ctx: &ToolContext) -> anyhow::Result<String> {
        let ToolArgs::SendDesignReport { email } = args else {
            anyhow::bail!("argument variant mismatch");
        };
        ctx.project.merge_lead(&LeadDetails {
            name: None,
            phone: None,
            email: Some(email),
        });
        Ok(
            "Great, I've noted your email address. We'll send the report at the end of our session."
                .to_string(),
        )
    }
}

struct CreateCalendarEvent;

#[async_trait]
impl ToolHandler for CreateCalendarEvent {
    async fn handle(&self, args: ToolArgs, ctx: &ToolContext) -> anyhow::Result<String> {
        let ToolArgs::CreateCalendarEvent(event) = args else {
            anyhow::bail!("argument variant mismatch");
        };

        if !ctx.calendar.is_connected() {
            return Ok(
                "The user's calendar is not connected. Please ask them to connect it in the settings first."
                    .to_string(),
            );
        }

        if let Err(reason) = event.validate() {
            tracing::warn!(%reason, "Rejected calendar event");
            return Ok(format!("I couldn't schedule that: {reason}."));
        }

        match ctx.calendar.create_event(&event).await {
            Ok(()) => {
                ctx.events.notify(
                    WebhookEvent::ConsultationScheduled,
                    json!({ "event": event, "lead_details": ctx.project.lead() }),
                );
                Ok(format!(
                    "OK, I've scheduled the event \"{}\" on the calendar.",
                    event.title
                ))
            }
            Err(e) => {
                tracing::error!("Calendar event creation failed: {:#}", e);
                Ok("Sorry, I wasn't able to schedule that event.".to_string())
            }
        }
    }
}

struct SwitchToScanningMode;

#[async_trait]
impl ToolHandler for SwitchToScanningMode {
    async fn handle(&self, _args: ToolArgs, ctx: &ToolContext) -> anyhow::Result<String> {
        ctx.project.set_pending_space_creation(true);
        Ok(
            "Okay, let's get ready to scan your next space. What would you like to call this room?"
                .to_string(),
        )
    }
}

struct SetActiveSpace;

#[async_trait]
impl ToolHandler for SetActiveSpace {
    async fn handle(&self, args: ToolArgs, ctx: &ToolContext) -> anyhow::Result<String> {
        let ToolArgs::SetActiveSpace { space_name } = args else {
            anyhow::bail!("argument variant mismatch");
        };
        match ctx.project.switch_active(&space_name) {
            Some(name) => Ok(format!("Okay, we're now looking at the {name}.")),
            None => Ok(format!("I couldn't find a space called \"{space_name}\".")),
        }
    }
}
