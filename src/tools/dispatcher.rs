//! Tool dispatch: resolve one model-issued invocation to exactly one spoken
//! result string.
//!
//! The dispatcher is the recovery boundary of the session: an unknown tool
//! name, malformed arguments, a handler error, a panic, or a timeout all
//! collapse into an explanatory sentence for the agent to speak, and the
//! session continues uninterrupted. Multiple invocations may be in flight
//! concurrently for the same session; each resolves independently under its
//! own call id.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

use super::args::ToolArgs;
use super::{ToolName, ToolRegistry};
use crate::core::transport::ToolInvocation;
use crate::integrations::{
    CalendarIntegration, EventSink, GenerativeBackend, LeadSink, ProjectStore,
};

/// Spoken fallback for anything the dispatcher cannot execute.
pub const FALLBACK_RESULT: &str = "I'm sorry, I wasn't able to do that.";

/// Spoken fallback for a handler that failed unexpectedly.
pub const FAILURE_RESULT: &str = "I encountered an error with that request.";

/// Spoken fallback for a handler that exceeded the dispatch timeout.
pub const TIMEOUT_RESULT: &str =
    "That's taking longer than expected. Let's give it another try in a moment.";

/// Defensive upper bound on a single tool call; image generation is the slow
/// case and finishes well inside this.
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything a handler may touch: collaborators plus the single-writer
/// project state it snapshots at invocation time.
pub struct ToolContext {
    pub project: ProjectStore,
    pub backend: Arc<dyn GenerativeBackend>,
    pub leads: Arc<dyn LeadSink>,
    pub calendar: Arc<dyn CalendarIntegration>,
    pub events: Arc<dyn EventSink>,
}

/// One registered tool implementation.
///
/// Handlers return `Ok` with the sentence to speak, including for failed
/// preconditions ("Please capture a photo for this space first."); `Err` is
/// reserved for unexpected failures and is replaced by a generic apology at
/// the dispatch boundary.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, args: ToolArgs, ctx: &ToolContext) -> anyhow::Result<String>;
}

/// Executes tool invocations against a persona's registry.
pub struct ToolDispatcher {
    registry: ToolRegistry,
    ctx: Arc<ToolContext>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry, ctx: Arc<ToolContext>) -> Self {
        Self {
            registry,
            ctx,
            timeout: DISPATCH_TIMEOUT,
        }
    }

    /// Override the per-invocation timeout (tests).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Names registered for this session's persona.
    pub fn tool_names(&self) -> Vec<ToolName> {
        self.registry.names()
    }

    /// Resolve one invocation to its spoken result.
    ///
    /// Never returns an error and never unwinds: every failure mode maps to
    /// an explanatory string so the `(call_id, result)` pair can always be
    /// returned to the transport.
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> String {
        let Some((name, handler)) = self.registry.get(&invocation.name) else {
            tracing::warn!(tool = %invocation.name, "Unknown tool requested");
            return FALLBACK_RESULT.to_string();
        };

        let args = match ToolArgs::parse(name, &invocation.args) {
            Ok(args) => args,
            Err(reason) => {
                tracing::warn!(tool = %name, %reason, "Malformed tool arguments");
                return FALLBACK_RESULT.to_string();
            }
        };

        tracing::info!(tool = %name, call_id = %invocation.call_id, "Dispatching tool call");

        let ctx = self.ctx.clone();
        let work = AssertUnwindSafe(async move { handler.handle(args, &ctx).await }).catch_unwind();

        match tokio::time::timeout(self.timeout, work).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => {
                tracing::error!(tool = %name, "Tool handler failed: {:#}", e);
                FAILURE_RESULT.to_string()
            }
            Ok(Err(_panic)) => {
                tracing::error!(tool = %name, "Tool handler panicked");
                FAILURE_RESULT.to_string()
            }
            Err(_elapsed) => {
                tracing::error!(tool = %name, "Tool handler timed out");
                TIMEOUT_RESULT.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::{
        CalendarEventRequest, DamageAnalysisReport, DesignImage, LeadDetails, NullEventSink,
        StyleSuggestion, WebhookEvent,
    };
    use serde_json::json;

    pub(crate) struct UnavailableBackend;

    #[async_trait]
    impl GenerativeBackend for UnavailableBackend {
        async fn analyze_image(&self, _: &DesignImage) -> anyhow::Result<String> {
            anyhow::bail!("backend offline")
        }
        async fn diagnose_image(&self, _: &DesignImage) -> anyhow::Result<String> {
            anyhow::bail!("backend offline")
        }
        async fn generate_remodel(
            &self,
            _: &str,
            _: &str,
            _: &DesignImage,
            _: bool,
        ) -> anyhow::Result<DesignImage> {
            anyhow::bail!("backend offline")
        }
        async fn visualize_repair(&self, _: &str, _: &DesignImage) -> anyhow::Result<DesignImage> {
            anyhow::bail!("backend offline")
        }
        async fn damage_analysis(&self, _: &DesignImage) -> anyhow::Result<DamageAnalysisReport> {
            anyhow::bail!("backend offline")
        }
        async fn generate_cleaned_image(
            &self,
            _: &DesignImage,
            _: &DamageAnalysisReport,
        ) -> anyhow::Result<DesignImage> {
            anyhow::bail!("backend offline")
        }
        async fn generate_remodel_from_cleaned(
            &self,
            _: &DesignImage,
            _: &DamageAnalysisReport,
            _: &str,
            _: &str,
        ) -> anyhow::Result<DesignImage> {
            anyhow::bail!("backend offline")
        }
        async fn style_suggestions(
            &self,
            _: &DamageAnalysisReport,
        ) -> anyhow::Result<Vec<StyleSuggestion>> {
            anyhow::bail!("backend offline")
        }
    }

    pub(crate) struct NullLeads;

    #[async_trait]
    impl LeadSink for NullLeads {
        async fn record(&self, _: &LeadDetails) -> anyhow::Result<()> {
            Ok(())
        }
    }

    pub(crate) struct DisconnectedCalendar;

    #[async_trait]
    impl CalendarIntegration for DisconnectedCalendar {
        fn is_connected(&self) -> bool {
            false
        }
        async fn create_event(&self, _: &CalendarEventRequest) -> anyhow::Result<()> {
            anyhow::bail!("not connected")
        }
    }

    fn ctx() -> Arc<ToolContext> {
        Arc::new(ToolContext {
            project: ProjectStore::new(),
            backend: Arc::new(UnavailableBackend),
            leads: Arc::new(NullLeads),
            calendar: Arc::new(DisconnectedCalendar),
            events: Arc::new(NullEventSink),
        })
    }

    fn invocation(name: &str, args: serde_json::Value) -> ToolInvocation {
        ToolInvocation {
            call_id: "call-1".to_string(),
            name: name.to_string(),
            args,
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl ToolHandler for PanickingHandler {
        async fn handle(&self, _: ToolArgs, _: &ToolContext) -> anyhow::Result<String> {
            panic!("handler bug")
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl ToolHandler for SlowHandler {
        async fn handle(&self, _: ToolArgs, _: &ToolContext) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    fn registry_with(name: ToolName, handler: Arc<dyn ToolHandler>) -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        registry.register(name, handler);
        registry
    }

    #[tokio::test]
    async fn test_unknown_tool_answers_with_fallback() {
        let dispatcher = ToolDispatcher::new(ToolRegistry::default(), ctx());
        let result = dispatcher.dispatch(&invocation("warp_drive", json!({}))).await;
        assert_eq!(result, FALLBACK_RESULT);
    }

    #[tokio::test]
    async fn test_malformed_args_answer_with_fallback() {
        let registry = ToolRegistry::builtin_for(&[crate::core::transport::ToolDeclaration {
            name: "set_active_space".to_string(),
            description: String::new(),
            parameters: None,
        }])
        .unwrap();
        let dispatcher = ToolDispatcher::new(registry, ctx());
        let result = dispatcher
            .dispatch(&invocation("set_active_space", json!({})))
            .await;
        assert_eq!(result, FALLBACK_RESULT);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_failure_string() {
        // The built-in diagnose handler hits the offline backend after its
        // photo precondition passes.
        let project = ProjectStore::new();
        project.add_image(DesignImage::new("Original", "b64", "image/jpeg"));
        let ctx = Arc::new(ToolContext {
            project,
            backend: Arc::new(UnavailableBackend),
            leads: Arc::new(NullLeads),
            calendar: Arc::new(DisconnectedCalendar),
            events: Arc::new(NullEventSink),
        });
        let registry = ToolRegistry::builtin_for(&[crate::core::transport::ToolDeclaration {
            name: "diagnose_problem_from_image".to_string(),
            description: String::new(),
            parameters: None,
        }])
        .unwrap();
        let dispatcher = ToolDispatcher::new(registry, ctx);
        let result = dispatcher
            .dispatch(&invocation("diagnose_problem_from_image", json!({})))
            .await;
        assert_eq!(result, FAILURE_RESULT);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let registry = registry_with(ToolName::SwitchToScanningMode, Arc::new(PanickingHandler));
        let dispatcher = ToolDispatcher::new(registry, ctx());
        let result = dispatcher
            .dispatch(&invocation("switch_to_scanning_mode", json!({})))
            .await;
        assert_eq!(result, FAILURE_RESULT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_handler_times_out() {
        let registry = registry_with(ToolName::SwitchToScanningMode, Arc::new(SlowHandler));
        let dispatcher =
            ToolDispatcher::new(registry, ctx()).with_timeout(Duration::from_millis(100));
        let result = dispatcher
            .dispatch(&invocation("switch_to_scanning_mode", json!({})))
            .await;
        assert_eq!(result, TIMEOUT_RESULT);
    }

    #[tokio::test]
    async fn test_concurrent_invocations_resolve_independently() {
        let registry = ToolRegistry::builtin_for(&[
            crate::core::transport::ToolDeclaration {
                name: "switch_to_scanning_mode".to_string(),
                description: String::new(),
                parameters: None,
            },
            crate::core::transport::ToolDeclaration {
                name: "send_design_report".to_string(),
                description: String::new(),
                parameters: None,
            },
        ])
        .unwrap();
        let dispatcher = Arc::new(ToolDispatcher::new(registry, ctx()));

        let inv_a = invocation("switch_to_scanning_mode", json!({}));
        let inv_b = invocation(
            "send_design_report",
            json!({ "email": "ada@example.com" }),
        );
        let a = dispatcher.dispatch(&inv_a);
        let b = dispatcher.dispatch(&inv_b);
        let (ra, rb) = tokio::join!(a, b);
        assert!(ra.contains("scan your next space"));
        assert!(rb.contains("noted your email"));
    }

    #[tokio::test]
    async fn test_calendar_gated_on_connection() {
        let registry = ToolRegistry::builtin_for(&[crate::core::transport::ToolDeclaration {
            name: "create_calendar_event".to_string(),
            description: String::new(),
            parameters: None,
        }])
        .unwrap();
        let dispatcher = ToolDispatcher::new(registry, ctx());
        let result = dispatcher
            .dispatch(&invocation(
                "create_calendar_event",
                json!({
                    "title": "Consultation",
                    "iso_start": "2025-12-01T15:00:00Z",
                    "iso_end": "2025-12-01T15:30:00Z"
                }),
            ))
            .await;
        assert!(result.contains("calendar is not connected"));
    }

    #[test]
    fn test_event_sink_kinds_available() {
        // Compile-time reminder that handlers emit these kinds.
        let _ = [
            WebhookEvent::LeadCaptured,
            WebhookEvent::ConsultationScheduled,
        ];
    }
}
