//! HTTP host bridge.
//!
//! The chat client (or a small adapter script inside it) posts every
//! incoming message, every `/tts` command line and every closed
//! conversation here. Runs on 127.0.0.1:8768 (configurable) using axum.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::activation::ConversationId;
use crate::command::CommandStatus;
use crate::plugin::{CommandOutcome, MessageOutcome, Plugin, PluginStatus};

pub type SharedPlugin = Arc<Mutex<Plugin>>;

#[derive(Clone)]
pub struct ApiState {
    pub plugin: SharedPlugin,
}

impl ApiState {
    pub fn new(plugin: Plugin) -> Self {
        Self {
            plugin: Arc::new(Mutex::new(plugin)),
        }
    }
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct MessageRequest {
    conversation: String,
    text: String,
}

#[derive(Deserialize)]
struct CommandRequest {
    conversation: String,
    line: String,
}

#[derive(Deserialize)]
struct ClosedRequest {
    conversation: String,
}

#[derive(Serialize)]
struct SimpleResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SimpleResponse {
    fn ok(status: &str) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    fn error(message: &str) -> Self {
        Self {
            status: "error".into(),
            error: Some(message.into()),
        }
    }
}

/// Build the axum router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .route("/message", post(handle_message))
        .route("/command", post(handle_command))
        .route("/conversation/closed", post(handle_closed))
        .with_state(state)
}

/// Serve the API until ctrl-c.
pub async fn serve_api(state: ApiState, port: u16) -> std::io::Result<()> {
    let app = router(state);
    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Host API listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {e}");
            }
        })
        .await
}

/// Run `f` against the plugin on the blocking pool; pipe and file writes
/// happen inside.
async fn with_plugin<T, F>(plugin: SharedPlugin, f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Plugin) -> T + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        let mut guard = plugin.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    })
    .await;

    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Plugin task failed: {e}");
            None
        }
    }
}

// --- Handlers ---

async fn handle_status(State(state): State<ApiState>) -> Json<Option<PluginStatus>> {
    Json(with_plugin(state.plugin, |p| p.status()).await)
}

async fn handle_message(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> Json<MessageOutcome> {
    let conversation = ConversationId::from(req.conversation);
    let outcome = with_plugin(state.plugin, move |p| p.handle_message(&conversation, &req.text))
        .await
        .unwrap_or_else(|| MessageOutcome {
            spoken: false,
            text: None,
            error: Some("plugin task failed".into()),
            lines: Vec::new(),
        });
    Json(outcome)
}

async fn handle_command(
    State(state): State<ApiState>,
    Json(req): Json<CommandRequest>,
) -> Json<CommandOutcome> {
    let conversation = ConversationId::from(req.conversation);
    let outcome = with_plugin(state.plugin, move |p| p.handle_command(&conversation, &req.line))
        .await
        .unwrap_or_else(|| CommandOutcome {
            status: CommandStatus::Failed,
            lines: vec!["plugin task failed".into()],
        });
    Json(outcome)
}

async fn handle_closed(
    State(state): State<ApiState>,
    Json(req): Json<ClosedRequest>,
) -> Json<SimpleResponse> {
    let conversation = ConversationId::from(req.conversation);
    let done = with_plugin(state.plugin, move |p| p.conversation_closed(&conversation)).await;
    Json(closed_response(done))
}

fn closed_response(done: Option<()>) -> SimpleResponse {
    match done {
        Some(()) => SimpleResponse::ok("ok"),
        None => SimpleResponse::error("plugin task failed"),
    }
}
