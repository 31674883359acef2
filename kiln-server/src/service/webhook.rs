//! Webhook Service
//!
//! Validates inbound GitHub deliveries and hands push events to the
//! pipeline. Nothing but the `pending` status report happens before the
//! caller gets its answer; the pipeline itself runs on its own task.

use std::sync::Arc;

use kiln_core::domain::build::BuildOutcome;
use kiln_core::domain::push::{PayloadError, PushEvent};
use kiln_core::domain::status::CommitState;
use kiln_runner::PipelineOrchestrator;
use tokio::task::JoinHandle;

/// Header carrying the GitHub event name
pub const EVENT_HEADER: &str = "x-github-event";

/// The only accepted body media type
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Service error type
#[derive(Debug)]
pub enum WebhookError {
    InvalidEventType(String),
    InvalidContentType(String),
    InvalidPayload(PayloadError),
}

impl From<PayloadError> for WebhookError {
    fn from(err: PayloadError) -> Self {
        WebhookError::InvalidPayload(err)
    }
}

/// What the dispatcher did with a delivery
#[derive(Debug)]
pub enum Dispatch {
    /// Connectivity check from GitHub; nothing was started
    Ping,
    /// A pipeline run was spawned
    Started(JoinHandle<BuildOutcome>),
}

/// Entry point for webhook deliveries
pub struct WebhookDispatcher {
    orchestrator: Arc<PipelineOrchestrator>,
}

impl WebhookDispatcher {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Handles one delivery
    ///
    /// Rules are applied in order: ping, event type, content type, payload.
    /// A valid push is reported `pending` and its pipeline spawned; the
    /// returned handle resolves when the run has finished.
    pub async fn dispatch(
        &self,
        event_type: Option<&str>,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<Dispatch, WebhookError> {
        let event_type = event_type.unwrap_or_default();

        if event_type == "ping" {
            tracing::info!("Received ping");
            return Ok(Dispatch::Ping);
        }

        if event_type != "push" {
            return Err(WebhookError::InvalidEventType(event_type.to_string()));
        }

        let content_type = content_type.unwrap_or_default();
        if !is_json(content_type) {
            return Err(WebhookError::InvalidContentType(content_type.to_string()));
        }

        let event = PushEvent::from_json(body)?;

        tracing::info!(
            "Push to {}/{} at {}",
            event.owner,
            event.repository,
            event.commit
        );

        self.orchestrator
            .report_status(&event, CommitState::Pending)
            .await;

        let handle = tokio::spawn(Arc::clone(&self.orchestrator).run(event));

        Ok(Dispatch::Started(handle))
    }
}

/// Whether a Content-Type header value names the JSON media type
///
/// Parameters such as `charset` are ignored.
fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|media| media.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
        .unwrap_or(false)
}
