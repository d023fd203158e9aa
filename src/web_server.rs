use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    serve, Form, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::sync::{mpsc, Mutex};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::agent::{Agent, AgentEvent};
use crate::chat::{self, ChatAction, ChatSession, ExamplePrompt, EXAMPLE_PROMPTS};
use crate::documents::count_documents;
use crate::transcript::Role;

pub const PAGE_TITLE: &str = "AI Care Assistant";
pub const HEADING: &str = "💙 Special Needs Care Assistant";
pub const CAPTION: &str = "AI-powered support for caregivers of individuals with special needs";

// Messages pushed to the page over the WebSocket
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SocketMessage {
    pub message_type: String,
    pub payload: serde_json::Value,
}

impl SocketMessage {
    fn new(message_type: &str, payload: serde_json::Value) -> Self {
        Self {
            message_type: message_type.to_string(),
            payload,
        }
    }
}

// Message the page sends to ask a question over the WebSocket
#[derive(Debug, Deserialize)]
struct AskRequest {
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct PromptForm {
    prompt: String,
}

// Unchecked boxes are simply absent from the form.
#[derive(Debug, Deserialize)]
struct SettingsForm {
    streaming: Option<String>,
}

/// Where the server listens and where it finds its page assets.
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub port: u16,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
}

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    agent: Arc<Agent>,
    // One session for the whole server; there is no per-user isolation.
    session: Arc<Mutex<ChatSession>>,
}

impl AppState {
    pub fn new(agent: Arc<Agent>, templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir.into())),
            agent,
            session: Arc::new(Mutex::new(ChatSession::default())),
        }
    }

    pub async fn session(&self) -> ChatSession {
        self.session.lock().await.clone()
    }

    // The lock is held for the whole action so turns never interleave.
    async fn apply(&self, action: ChatAction) {
        let mut session = self.session.lock().await;
        let current = session.clone();
        *session = chat::handle_action(&self.agent, current, action).await;
    }
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        // Watch the templates directory for changes
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let session = state.session().await;
    let docs_dir = state.agent.config().docs_dir.clone();
    let docs_label = docs_dir.display().to_string();
    let docs_count = tokio::task::spawn_blocking(move || count_documents(docs_dir))
        .await
        .unwrap_or_else(|e| {
            warn!("Failed to count documents: {}", e);
            0
        });

    let examples: &[ExamplePrompt] = if session.transcript.is_empty() {
        &EXAMPLE_PROMPTS
    } else {
        &[]
    };

    // Acquire env, get template, and render within the same block
    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                let context = minijinja::context! {
                    page_title => PAGE_TITLE,
                    heading => HEADING,
                    caption => CAPTION,
                    messages => session.transcript.messages(),
                    streaming => session.streaming,
                    docs_count => docs_count,
                    docs_dir => docs_label,
                    examples => examples,
                };
                tmpl.render(context)
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
        })
}

async fn chat_handler(State(state): State<AppState>, Form(form): Form<PromptForm>) -> Redirect {
    state.apply(ChatAction::Submit(form.prompt)).await;
    Redirect::to("/")
}

async fn clear_handler(State(state): State<AppState>) -> Redirect {
    info!("Clearing chat history");
    state.apply(ChatAction::Clear).await;
    Redirect::to("/")
}

async fn settings_handler(State(state): State<AppState>, Form(form): Form<SettingsForm>) -> Redirect {
    let streaming = form.streaming.is_some();
    info!(streaming, "Updating settings");
    state.apply(ChatAction::SetStreaming(streaming)).await;
    Redirect::to("/")
}

async fn example_handler(State(state): State<AppState>, Path(index): Path<usize>) -> Response {
    if index >= EXAMPLE_PROMPTS.len() {
        return (StatusCode::NOT_FOUND, "Unknown example").into_response();
    }
    state.apply(ChatAction::Example(index)).await;
    Redirect::to("/").into_response()
}

// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_json(socket: &mut WebSocket, msg: &SocketMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json_msg) => socket.send(Message::Text(json_msg)).await,
        Err(e) => {
            error!("Failed to serialize socket message: {}", e);
            Ok(())
        }
    }
}

// Handle individual WebSocket connections
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("New WebSocket connection established");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let request = match serde_json::from_str::<AskRequest>(&text) {
                    Ok(request) => request,
                    Err(e) => {
                        warn!("Ignoring malformed client message: {}", e);
                        let reply = SocketMessage::new(
                            "Error",
                            serde_json::json!({ "message": format!("malformed request: {e}") }),
                        );
                        if send_json(&mut socket, &reply).await.is_err() {
                            break;
                        }
                        continue;
                    }
                };
                if request.prompt.trim().is_empty() {
                    continue;
                }
                if let Err(e) = answer_over_socket(&mut socket, &state, request.prompt).await {
                    warn!("WebSocket client disconnected or send error: {}", e);
                    break;
                }
            }
            Message::Binary(_) => {
                warn!("Received unexpected binary message from client");
            }
            Message::Close(_) => {
                info!("Client requested WebSocket close");
                break;
            }
            // Axum answers pings itself
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
    info!("WebSocket connection closed");
}

/// Stream one answer to the page: `Delta` per text fragment, `Tool` per tool
/// call, then `Done` carrying the content recorded in the transcript.
async fn answer_over_socket(
    socket: &mut WebSocket,
    state: &AppState,
    prompt: String,
) -> Result<(), axum::Error> {
    let mut session = state.session.lock().await;
    let mut current = session.clone();
    current.transcript.append(Role::User, prompt.as_str());

    let (tx, mut rx) = mpsc::channel(64);
    let history = chat::history_before_last(&current.transcript);
    let producer = state.agent.run_streamed(history, &prompt, tx);
    let consumer = async {
        let mut answer = String::new();
        let mut delivered = Ok(());
        while let Some(event) = rx.recv().await {
            let outgoing = match &event {
                AgentEvent::TextDelta(text) => {
                    answer.push_str(text);
                    SocketMessage::new("Delta", serde_json::json!({ "text": text }))
                }
                AgentEvent::ToolCalled { name, .. } => {
                    SocketMessage::new("Tool", serde_json::json!({ "name": name }))
                }
            };
            if delivered.is_ok() {
                delivered = send_json(socket, &outgoing).await;
            }
        }
        (answer, delivered)
    };

    let (result, (answer, delivered)) = tokio::join!(producer, consumer);
    let content = chat::record_answer(&mut current, result.map(|()| answer));
    *session = current;
    drop(session);

    delivered?;
    send_json(
        socket,
        &SocketMessage::new("Done", serde_json::json!({ "content": content })),
    )
    .await
}

pub fn create_router(state: AppState, static_dir: impl Into<PathBuf>) -> Router {
    // Serve static files from the static directory
    let static_files_service = ServeDir::new(static_dir.into()).not_found_service(
        tower::service_fn(|_req: axum::extract::Request| async {
            Ok::<_, std::convert::Infallible>((StatusCode::NOT_FOUND, "Not Found").into_response())
        }),
    );

    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .route("/clear", post(clear_handler))
        .route("/settings", post(settings_handler))
        .route("/examples/:index", post(example_handler))
        .route("/ws", get(ws_handler))
        .nest_service("/static", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(agent: Arc<Agent>, config: WebConfig) -> Result<()> {
    let state = AppState::new(agent, config.templates_dir);
    let app = create_router(state, config.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Web server listening on http://{}", addr);

    // Bind using tokio::net::TcpListener
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
