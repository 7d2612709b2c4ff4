//! HTTP transport — JSON POST endpoint with bearer-token auth and /health.
//!
//! Sessions are keyed by the `X-Session-ID` header; clients that omit it
//! share one anonymous session.

#[cfg(feature = "http")]
use std::sync::Arc;

#[cfg(feature = "http")]
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json as AxumJson, Response},
    routing::{get, post},
    Router,
};

#[cfg(feature = "http")]
use crate::protocol::ProtocolHandler;
#[cfg(feature = "http")]
use crate::types::{error_codes, McpResult};

#[cfg(feature = "http")]
const ANONYMOUS_SESSION_ID: &str = "http-anonymous";

/// Shared server state passed to all handlers via axum State.
#[cfg(feature = "http")]
pub struct ServerState {
    pub token: Option<String>,
    pub handler: Arc<ProtocolHandler>,
}

/// HTTP transport for web-based gateway clients.
#[cfg(feature = "http")]
pub struct HttpTransport {
    state: Arc<ServerState>,
}

#[cfg(feature = "http")]
impl HttpTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self::with_config(None, handler)
    }

    pub fn with_config(token: Option<String>, handler: ProtocolHandler) -> Self {
        Self {
            state: Arc::new(ServerState {
                token,
                handler: Arc::new(handler),
            }),
        }
    }

    /// Run the HTTP server on the given address.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let state = self.state.clone();

        let app = Router::new()
            .route("/mcp", post(handle_request))
            .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
            .route("/health", get(handle_health))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(crate::types::McpError::Io)?;

        tracing::info!("HTTP transport listening on {addr}");

        axum::serve(listener, app)
            .await
            .map_err(|e| crate::types::McpError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Auth middleware — checks the Bearer token if one is configured.
/// /health is a separate route that bypasses this layer.
#[cfg(feature = "http")]
async fn auth_layer(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: middleware::Next,
) -> Response {
    if let Some(expected) = &state.token {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                AxumJson(serde_json::json!({
                    "request_id": null,
                    "error": {
                        "code": error_codes::INVALID_REQUEST,
                        "message": "Unauthorized"
                    }
                })),
            )
                .into_response();
        }
    }

    next.run(request).await
}

#[cfg(feature = "http")]
async fn handle_request(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    AxumJson(body): AxumJson<serde_json::Value>,
) -> AxumJson<serde_json::Value> {
    let session_id = headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(ANONYMOUS_SESSION_ID)
        .to_string();

    match state.handler.handle_message(body, &session_id).await {
        Some(response) => AxumJson(response),
        None => AxumJson(serde_json::Value::Null),
    }
}

/// Health check endpoint — no auth required.
#[cfg(feature = "http")]
async fn handle_health(State(state): State<Arc<ServerState>>) -> AxumJson<serde_json::Value> {
    AxumJson(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_jobs": state.handler.jobs().active_count(),
    }))
}
