//! Main dispatcher — normalizes incoming messages, negotiates handshakes,
//! and routes tool calls to inline execution or the job manager.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use agentic_gateway::{
    AsyncJobManager, EventSink, GatewayEvent, JobOutcome, JobResult, ProgressReporter,
    SchemaValidator, TracingEventSink,
};

use crate::tools::ToolRegistry;
use crate::types::*;

use super::compat;
use super::negotiation::VersionNegotiator;
use super::validator::{validate_handshake, validate_tool_call};

/// Negotiated state kept per session. Overwritten whenever the session
/// handshakes again; sessions are independent of each other.
#[derive(Debug, Clone)]
struct SessionState {
    negotiation: NegotiationResult,
}

impl SessionState {
    fn has_capability(&self, capability: &str) -> bool {
        self.negotiation
            .agreed_capabilities
            .as_ref()
            .is_some_and(|caps| caps.iter().any(|c| c == capability))
    }
}

/// The protocol composition root.
pub struct ProtocolHandler {
    negotiator: VersionNegotiator,
    tools: Arc<ToolRegistry>,
    jobs: Arc<AsyncJobManager>,
    validator: Arc<SchemaValidator>,
    sessions: Mutex<HashMap<String, SessionState>>,
    transport: Transport,
    events: Arc<dyn EventSink>,
}

impl ProtocolHandler {
    pub fn new(tools: Arc<ToolRegistry>, jobs: Arc<AsyncJobManager>) -> Self {
        Self {
            negotiator: VersionNegotiator::with_defaults(),
            tools,
            jobs,
            validator: Arc::new(SchemaValidator::new()),
            sessions: Mutex::new(HashMap::new()),
            transport: Transport::Stdio,
            events: Arc::new(TracingEventSink),
        }
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_negotiator(mut self, negotiator: VersionNegotiator) -> Self {
        self.negotiator = negotiator;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn negotiator(&self) -> &VersionNegotiator {
        &self.negotiator
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn jobs(&self) -> &AsyncJobManager {
        &self.jobs
    }

    /// Handle one raw wire message for the given session. `None` means no
    /// response is owed (legacy notifications).
    pub async fn handle_message(&self, raw: Value, session_id: &str) -> Option<Value> {
        let message: IncomingMessage = match serde_json::from_value(raw) {
            Ok(message) => message,
            Err(e) => return Some(McpError::ParseError(e.to_string()).to_response(None)),
        };

        match message {
            IncomingMessage::Handshake(handshake) => {
                Some(self.handle_handshake(handshake, session_id).await)
            }
            IncomingMessage::JobControl(control) => Some(self.handle_job_control(control).await),
            IncomingMessage::ToolCall(request) => {
                Some(self.route_tool_call(request, session_id).await)
            }
            IncomingMessage::Legacy(legacy) => self.handle_legacy(legacy, session_id).await,
        }
    }

    /// Negotiate a handshake and store the outcome under the session id.
    ///
    /// Always answers with the server handshake; an incompatible client finds
    /// the rejection, echoing both versions, in the attached negotiation
    /// result.
    pub async fn handle_handshake(
        &self,
        handshake: ClientHandshake,
        session_id: &str,
    ) -> Value {
        if let Err(e) = validate_handshake(&handshake) {
            return e.to_response(None);
        }

        let negotiation = self.negotiator.negotiate(&handshake);
        self.events.emit(GatewayEvent::NegotiationOutcome {
            client_id: handshake.client_id.clone(),
            success: negotiation.success,
            agreed_version: negotiation.agreed_version.clone(),
        });

        {
            let mut sessions = self.sessions.lock().await;
            sessions.insert(
                session_id.to_string(),
                SessionState {
                    negotiation: negotiation.clone(),
                },
            );
        }

        let server = self.negotiator.create_server_handshake(
            SERVER_ID,
            self.transport,
            ServerInfo::default_info(),
        );
        serde_json::to_value(HandshakeResponse {
            server,
            negotiation,
        })
        .unwrap_or_default()
    }

    /// Validate a tool call and execute it inline or as a tracked job.
    pub async fn route_tool_call(&self, request: ToolCallRequest, session_id: &str) -> Value {
        if let Err(e) = validate_tool_call(&request) {
            return e.to_response(Some(&request.request_id));
        }

        let Some(tool) = self.tools.get(&request.tool_id) else {
            return McpError::ToolNotFound(request.tool_id.clone())
                .to_response(Some(&request.request_id));
        };

        let arguments = request.arguments_or_empty();
        let validation = self.validator.validate_input(&tool.input_schema, &arguments);
        if !validation.valid {
            // The executor is never invoked on schema failure.
            return McpError::SchemaValidationFailed {
                stage: "input",
                errors: validation.errors,
            }
            .to_response(Some(&request.request_id));
        }

        let async_session = {
            let sessions = self.sessions.lock().await;
            sessions
                .get(session_id)
                .is_some_and(|s| s.has_capability("async"))
        };

        if request.mode == CallMode::Async || async_session {
            return match self.jobs.submit(
                &request.request_id,
                &request.tool_id,
                arguments,
                tool.executor.clone(),
            ) {
                Ok(handle) => serde_json::to_value(handle).unwrap_or_default(),
                Err(e) => McpError::from(e).to_response(Some(&request.request_id)),
            };
        }

        match tool
            .executor
            .run(
                arguments,
                ProgressReporter::detached(),
                CancellationToken::new(),
            )
            .await
        {
            Ok(value) => {
                if let Some(schema) = &tool.output_schema {
                    let validation = self.validator.validate_output(schema, &value);
                    if !validation.valid {
                        return McpError::SchemaValidationFailed {
                            stage: "output",
                            errors: validation.errors,
                        }
                        .to_response(Some(&request.request_id));
                    }
                }
                serde_json::to_value(JobResult {
                    request_id: request.request_id.clone(),
                    status: JobOutcome::Success,
                    result: Some(value),
                    error: None,
                })
                .unwrap_or_default()
            }
            Err(e) => serde_json::to_value(JobResult {
                request_id: request.request_id.clone(),
                status: JobOutcome::Error,
                result: None,
                error: Some(e.to_string()),
            })
            .unwrap_or_default(),
        }
    }

    async fn handle_job_control(&self, control: JobControlRequest) -> Value {
        let request_id = control.request_id.clone();
        let job_id = match (control.op, &control.job_id) {
            (JobOp::List, _) => String::new(),
            (_, Some(id)) => id.clone(),
            (op, None) => {
                return McpError::InvalidParams(format!("job_id is required for {op:?}"))
                    .to_response(Some(&request_id));
            }
        };

        match control.op {
            JobOp::Poll => match self.jobs.poll(&job_id) {
                Ok(job) => serde_json::to_value(job).unwrap_or_default(),
                Err(e) => McpError::from(e).to_response(Some(&request_id)),
            },
            JobOp::Resume => match self.jobs.resume(&job_id).await {
                Ok(result) => serde_json::to_value(result).unwrap_or_default(),
                Err(e) => McpError::from(e).to_response(Some(&request_id)),
            },
            JobOp::Cancel => match self.jobs.cancel(&job_id) {
                Ok(cancelled) => serde_json::to_value(CancelResponse {
                    request_id,
                    job_id,
                    cancelled,
                })
                .unwrap_or_default(),
                Err(e) => McpError::from(e).to_response(Some(&request_id)),
            },
            JobOp::List => {
                let listing = self.jobs.list(control.limit, control.status);
                serde_json::to_value(listing).unwrap_or_default()
            }
        }
    }

    /// Dispatch a legacy-shaped request and wrap the reply in the legacy
    /// envelope.
    async fn handle_legacy(&self, legacy: LegacyRequest, session_id: &str) -> Option<Value> {
        if legacy.method.is_empty() && legacy.version.is_none() {
            return Some(
                McpError::InvalidRequest("unrecognized message shape".to_string())
                    .to_response(None),
            );
        }

        let legacy_id = legacy.id.clone();
        let response = match legacy.method.as_str() {
            "initialize" => {
                let handshake = compat::convert_handshake(&legacy);
                self.handle_handshake(handshake, session_id).await
            }
            "initialized" | "notifications/initialized" => return None,
            "ping" => json!({}),
            "shutdown" => {
                tracing::info!("shutdown requested by legacy client");
                json!({})
            }
            "tools/list" => serde_json::to_value(ToolListResult {
                tools: self.tools.list(),
            })
            .unwrap_or_default(),
            _ => {
                // Every other legacy method is treated as a tool invocation.
                let request = compat::convert_to_modern(&legacy);
                self.route_tool_call(request, session_id).await
            }
        };

        Some(compat::convert_to_legacy(&response, legacy_id.as_ref(), true))
    }
}
