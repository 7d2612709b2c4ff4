//! Structured event notifications emitted by the gateway.

/// Events published to the configured [`EventSink`].
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    NegotiationOutcome {
        client_id: String,
        success: bool,
        agreed_version: Option<String>,
    },
    JobSubmitted {
        job_id: String,
        tool_id: String,
    },
    JobCompleted {
        job_id: String,
    },
    JobFailed {
        job_id: String,
        error: String,
    },
    JobCancelled {
        job_id: String,
    },
}

impl GatewayEvent {
    /// Dotted event name as seen by downstream sinks.
    pub fn name(&self) -> &'static str {
        match self {
            GatewayEvent::NegotiationOutcome { .. } => "negotiation.outcome",
            GatewayEvent::JobSubmitted { .. } => "job.submitted",
            GatewayEvent::JobCompleted { .. } => "job.completed",
            GatewayEvent::JobFailed { .. } => "job.failed",
            GatewayEvent::JobCancelled { .. } => "job.cancelled",
        }
    }
}

/// Sink for structured gateway notifications.
///
/// The gateway never inspects what a sink does with an event; implementations
/// may log, forward to an event bus, or drop them.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: GatewayEvent);
}

/// Default sink that forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: GatewayEvent) {
        match &event {
            GatewayEvent::NegotiationOutcome {
                client_id,
                success,
                agreed_version,
            } => {
                tracing::info!(
                    event = event.name(),
                    client_id = %client_id,
                    success = *success,
                    agreed_version = agreed_version.as_deref().unwrap_or("-"),
                    "negotiation finished"
                );
            }
            GatewayEvent::JobSubmitted { job_id, tool_id } => {
                tracing::info!(
                    event = event.name(),
                    job_id = %job_id,
                    tool_id = %tool_id,
                    "job submitted"
                );
            }
            GatewayEvent::JobCompleted { job_id } => {
                tracing::info!(event = event.name(), job_id = %job_id, "job completed");
            }
            GatewayEvent::JobFailed { job_id, error } => {
                tracing::warn!(event = event.name(), job_id = %job_id, error = %error, "job failed");
            }
            GatewayEvent::JobCancelled { job_id } => {
                tracing::info!(event = event.name(), job_id = %job_id, "job cancelled");
            }
        }
    }
}
