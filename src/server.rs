use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::transform::ResponseTransformer;
use crate::upstream::{AgentClient, AgentUpstream, MockUpstream};

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");
const X_SESSION_ID: HeaderName = HeaderName::from_static("x-session-id");

#[derive(Clone)]
pub struct AppState {
    upstream: Arc<dyn AgentUpstream>,
}

impl AppState {
    pub fn new(upstream: impl AgentUpstream + 'static) -> Self {
        Self {
            upstream: Arc::new(upstream),
        }
    }

    /// Real agent client, or the fixture when mock mode is on.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, BridgeError> {
        if config.mock_upstream {
            info!("mock upstream enabled, agent service will not be contacted");
            Ok(Self::new(MockUpstream::new()))
        } else {
            Ok(Self::new(AgentClient::new(config)?))
        }
    }
}

/// Chat request as sent by the browser UI.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    /// Either a plain string or a list of `{type: "text", text}` parts.
    #[serde(default)]
    pub content: Value,
}

impl ChatMessage {
    fn text(&self) -> String {
        match &self.content {
            Value::String(text) => text.clone(),
            Value::Array(parts) => parts
                .iter()
                .filter(|p| p["type"] == "text")
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join(""),
            _ => String::new(),
        }
    }
}

impl ChatRequest {
    /// Text of the most recent user message, if it has any.
    pub fn prompt(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(ChatMessage::text)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Failures that happen before streaming starts. Once the stream is open,
/// faults only shorten it.
#[derive(Debug)]
pub enum ApiFailure {
    BadRequest(String),
    Upstream(BridgeError),
}

impl From<BridgeError> for ApiFailure {
    fn from(e: BridgeError) -> Self {
        ApiFailure::Upstream(e)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiFailure::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiFailure::Upstream(e) => {
                warn!(error = %e, "agent request failed");
                let status = match e {
                    BridgeError::Request(_) | BridgeError::ApiError { .. } => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers([X_SESSION_ID]),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiFailure> {
    let prompt = request
        .prompt()
        .ok_or_else(|| ApiFailure::BadRequest("no user message to send".into()))?;
    let session_id = request
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    state.upstream.create_session(&session_id).await?;
    let upstream = state.upstream.open_turn(&session_id, &prompt).await?;
    info!(session_id = %session_id, "streaming agent turn");

    Ok(event_stream_response(
        Body::from_stream(ResponseTransformer::new(upstream)),
        &session_id,
    ))
}

fn event_stream_response(body: Body, session_id: &str) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-transform"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
    if let Ok(value) = HeaderValue::from_str(session_id) {
        headers.insert(X_SESSION_ID, value);
    }
    response
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &BridgeConfig) -> Result<(), BridgeError> {
    let app = router(AppState::from_config(config)?);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, agent = %config.agent_base_url, "agent bridge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
