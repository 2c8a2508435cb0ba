use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    serve, Json, Router,
};
use futures::StreamExt;
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::client::DecisionClient;
use crate::constants::{MAX_REASONING_CHARS, MIN_OPTIONS};
use crate::countdown::countdown;
use crate::error::DecisionError;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

// Messages pushed to every connected WebSocket client
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BroadcastMessage {
    pub message_type: String,
    pub payload: serde_json::Value,
}

impl BroadcastMessage {
    pub fn info(message: &str) -> Self {
        Self {
            message_type: "Info".to_string(),
            payload: serde_json::json!({ "message": message }),
        }
    }

    pub fn countdown(remaining: u64) -> Self {
        Self {
            message_type: "Countdown".to_string(),
            payload: serde_json::json!({ "remaining": remaining }),
        }
    }
}

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<Environment<'static>>,
    client: Arc<DecisionClient>,
    // Channel for broadcasting messages to all connected WebSocket clients
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    // Only one countdown runs at a time
    countdown_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AppState {
    pub fn new(client: Arc<DecisionClient>) -> Result<Self> {
        let templates = create_minijinja_env().context("Failed to initialize template engine")?;
        let (broadcast_tx, _) = broadcast::channel::<BroadcastMessage>(100); // Capacity of 100 messages
        Ok(Self {
            templates: Arc::new(templates),
            client,
            broadcast_tx,
            countdown_task: Arc::new(Mutex::new(None)),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.broadcast_tx.subscribe()
    }

    /// Start broadcasting a countdown, replacing any countdown already running.
    async fn start_countdown(&self, seconds: u64) {
        let tx = self.broadcast_tx.clone();
        let handle = tokio::spawn(async move {
            let ticks = countdown(seconds);
            tokio::pin!(ticks);
            while let Some(remaining) = ticks.next().await {
                // No receivers is fine, nobody is watching
                let _ = tx.send(BroadcastMessage::countdown(remaining));
            }
        });
        if let Some(previous) = self.countdown_task.lock().await.replace(handle) {
            previous.abort();
        }
    }
}

fn create_minijinja_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("index.html", INDEX_TEMPLATE)?;
    Ok(env)
}

#[derive(Debug, Deserialize)]
pub struct OptionsPayload {
    pub options: Vec<String>,
}

/// JSON error body plus status code for a [`DecisionError`].
struct ApiError(DecisionError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            DecisionError::NotEnoughOptions => StatusCode::BAD_REQUEST,
            DecisionError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            DecisionError::Busy => StatusCode::CONFLICT,
            DecisionError::AnalysisFailed(_) => StatusCode::BAD_GATEWAY,
        };
        let body = Json(serde_json::json!({
            "error": {
                "kind": self.0.kind(),
                "title": self.0.title(),
                "message": self.0.to_string(),
                "retryAfterSeconds": self.0.retry_after_seconds(),
            }
        }));
        match self.0.retry_after_seconds() {
            Some(seconds) => (status, [(header::RETRY_AFTER, seconds.to_string())], body).into_response(),
            None => (status, body).into_response(),
        }
    }
}

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    state
        .templates
        .get_template("index.html")
        .and_then(|tmpl| {
            let context = minijinja::context! {
                title => "DecisionWise",
                min_options => MIN_OPTIONS,
                max_reasoning => MAX_REASONING_CHARS,
            };
            tmpl.render(context)
        })
        .map(Html) // Wrap successful render in Html()
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Html(format!("Internal Server Error: {}", e)))
        })
}

async fn decide_handler(
    State(state): State<AppState>,
    Json(payload): Json<OptionsPayload>,
) -> Response {
    // Runs on its own task so a dispatched request survives the caller hanging up
    let client = state.client.clone();
    let decision = tokio::spawn(async move { client.decide(&payload.options).await });

    match decision.await {
        Ok(Ok(result)) => Json(result).into_response(),
        Ok(Err(err)) => {
            if let Some(seconds) = err.retry_after_seconds() {
                state.start_countdown(seconds).await;
            }
            ApiError(err).into_response()
        }
        Err(e) => {
            error!("Decision task failed: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn summarize_handler(
    State(state): State<AppState>,
    Json(payload): Json<OptionsPayload>,
) -> Response {
    match state.client.summarize(&payload.options).await {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

// Forward broadcasts to one WebSocket client until it goes away
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("New WebSocket connection established");
    let mut broadcast_rx = state.broadcast_tx.subscribe();

    let welcome_msg = BroadcastMessage::info("Connected to DecisionWise");
    if let Ok(json_msg) = serde_json::to_string(&welcome_msg) {
        if socket.send(Message::Text(json_msg)).await.is_err() {
            warn!("Failed to send welcome message to new WebSocket client");
            return;
        }
    }

    loop {
        tokio::select! {
            Ok(msg) = broadcast_rx.recv() => {
                if let Ok(json_msg) = serde_json::to_string(&msg) {
                    if socket.send(Message::Text(json_msg)).await.is_err() {
                        warn!("WebSocket client disconnected or send error. Closing connection.");
                        break;
                    }
                } else {
                    error!("Failed to serialize broadcast message");
                }
            }

            Some(Ok(msg)) = socket.recv() => {
                match msg {
                    Message::Close(_) => {
                        info!("Client requested WebSocket close");
                        break;
                    }
                    // The channel is push-only; pings are answered by axum
                    other => {
                        warn!("Ignoring WebSocket message from client: {:?}", other);
                    }
                }
            }

            else => {
                info!("WebSocket client disconnected");
                break;
            }
        }
    }
    info!("WebSocket connection closed");
}

pub fn build_router(state: AppState, static_dir: &str) -> Router {
    // Serve static files (stylesheet, page script)
    let static_files_service = ServeDir::new(static_dir).not_found_service(tower::service_fn(|_req: axum::extract::Request| async {
        Ok::<_, std::convert::Infallible>((StatusCode::NOT_FOUND, "Not Found").into_response())
    }));

    Router::new()
        .route("/", get(index_handler))
        .route("/api/decide", post(decide_handler))
        .route("/api/summarize", post(summarize_handler))
        .route("/ws", get(ws_handler))
        .nest_service("/static", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(port: u16, client: Arc<DecisionClient>, static_dir: &str) -> Result<()> {
    let state = AppState::new(client)?;
    let app = build_router(state, static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
