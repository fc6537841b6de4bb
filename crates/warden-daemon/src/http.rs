// http.rs — The inbound hook endpoint.
//
// POST /hooks/agent is the only way messages reach the router. Requests
// without the shared-secret bearer token are rejected before the router
// sees them. Every accepted request is answered with 200 and reply text,
// whatever happened inside the pipeline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use warden_router::Router;

const TOKEN_LEN: usize = 40;
const TOKEN_PREFIX_LEN: usize = 6;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub token: Arc<str>,
    /// Per-request deadline handed to `process_with_deadline`.
    pub deadline: Duration,
}

impl AppState {
    pub fn new(router: Router, token: impl Into<String>) -> Self {
        let deadline = router.request_timeout();
        Self {
            router: Arc::new(router),
            token: Arc::from(token.into()),
            deadline,
        }
    }
}

/// Body of `POST /hooks/agent`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookRequest {
    pub message: String,
    #[serde(default)]
    pub session_key: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_channel() -> String {
    "webhook".to_string()
}

/// Reply to `POST /hooks/agent`, addressed back to the sender.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct HookReply {
    pub text: String,
    pub deliver: bool,
    pub channel: String,
    pub to: String,
}

/// The hook router: `POST /hooks/agent` and `GET /health`.
pub fn app(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/hooks/agent", post(hook_agent))
        .route("/health", get(health))
        .with_state(state)
}

/// A random alphanumeric token from the OS CSPRNG.
pub fn generate_token() -> String {
    rand::rngs::OsRng
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Use the configured token, or generate one for this run. A generated
/// token is printed once to stdout; logs only ever see its prefix.
pub fn resolve_token(configured: Option<String>) -> String {
    if let Some(token) = configured.filter(|t| !t.trim().is_empty()) {
        return token;
    }
    let token = generate_token();
    println!("hook token: {token}");
    tracing::warn!(
        token_prefix = %token_prefix(&token),
        "WARDEN_HOOK_TOKEN not set; generated a token for this run"
    );
    token
}

/// The first few characters of a token, safe to log.
pub fn token_prefix(token: &str) -> String {
    let prefix: String = token.chars().take(TOKEN_PREFIX_LEN).collect();
    format!("{prefix}...")
}

/// Bind and serve until ctrl-c.
pub async fn serve(state: AppState, bind: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "hook endpoint listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("hook endpoint shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn hook_agent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<HookRequest>,
) -> Response {
    if !authorized(&headers, &state.token) {
        tracing::warn!(sender = %request.sender, channel = %request.channel, "hook request with bad token");
        return error(StatusCode::UNAUTHORIZED, "missing or invalid bearer token");
    }
    if request.message.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "message must not be empty");
    }
    if request.sender.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "sender must not be empty");
    }

    let text = state
        .router
        .process_with_deadline(
            &request.message,
            &request.sender,
            &request.channel,
            &request.session_key,
            request.metadata,
            state.deadline,
        )
        .await;

    Json(HookReply {
        text,
        deliver: true,
        channel: request.channel,
        to: request.sender,
    })
    .into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn authorized(headers: &HeaderMap, token: &str) -> bool {
    let Some(presented) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return false;
    };
    constant_time_eq(presented.trim().as_bytes(), token.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
