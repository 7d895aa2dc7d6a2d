use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::{json, Value};
use tiger_maze_server::constants::TICK_MS;
use tiger_maze_server::engine::{now_ms, EngineOptions, GameEngine};
use tiger_maze_server::error::LevelLoadError;
use tiger_maze_server::server_protocol::{parse_client_message, ParsedClientMessage, Viewport};
use tiger_maze_server::server_utils::{
    normalize_level, normalize_seed, parse_port, resolve_cell_size,
};
use tiger_maze_server::session::LevelSession;
use tiger_maze_server::types::LevelStatus;
use tiger_maze_server::world::{level_file_path, LevelDescriptor};
use tokio::sync::mpsc;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug)]
struct ServerConfig {
    levels_dir: PathBuf,
}

type SharedConfig = Arc<ServerConfig>;

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

/// Per-connection state: at most one level session at a time.
struct Connection {
    id: String,
    tx: mpsc::Sender<OutboundMessage>,
    session: Option<LevelSession>,
    config: SharedConfig,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let port = parse_port(std::env::var("PORT").ok().as_deref());
    let levels_dir = std::env::var("LEVELS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("levels"));
    info!(levels_dir = %levels_dir.to_string_lossy(), "level source configured");

    let config = Arc::new(ServerConfig { levels_dir });
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(config);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.to_string_lossy(), "serving static client");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found; serving websocket only");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    info!(port, "listening");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("dist"), PathBuf::from("frontend/dist")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(config): State<SharedConfig>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(config, socket))
}

async fn handle_socket(config: SharedConfig, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    let mut connection = Connection {
        id: make_id("client"),
        tx: tx.clone(),
        session: None,
        config,
    };
    info!(client = %connection.id, "client connected");

    let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !tick_session(&mut connection) {
                    break;
                }
            }
            received = ws_receiver.next() => {
                let Some(Ok(message)) = received else {
                    break;
                };
                let keep_open = match message {
                    Message::Text(raw) => handle_client_message(&mut connection, raw.as_str()).await,
                    Message::Binary(raw) => match String::from_utf8(raw.to_vec()) {
                        Ok(text) => handle_client_message(&mut connection, &text).await,
                        Err(_) => send_error(&connection, "invalid utf8 message"),
                    },
                    Message::Close(_) => false,
                    _ => true,
                };
                if !keep_open {
                    break;
                }
            }
        }
    }

    if let Some(session) = connection.session.as_mut() {
        session.teardown();
    }
    info!(client = %connection.id, "client disconnected");
    drop(connection);
    drop(tx);
    let _ = writer.await;
}

/// Returns false when the connection should be closed.
async fn handle_client_message(connection: &mut Connection, raw: &str) -> bool {
    let Some(message) = parse_client_message(raw) else {
        return send_error(connection, "invalid message");
    };

    match message {
        ParsedClientMessage::Start {
            level,
            seed,
            cell_size,
            viewport,
        } => {
            start_level(
                connection,
                normalize_level(level),
                normalize_seed(seed),
                cell_size,
                viewport,
            )
            .await
        }
        ParsedClientMessage::Move { target } => {
            if let Some(engine) = running_engine(connection) {
                engine.request_move(target);
            }
            true
        }
        ParsedClientMessage::Step { dir } => {
            if let Some(engine) = running_engine(connection) {
                engine.request_step(dir);
            }
            true
        }
        ParsedClientMessage::Pause => {
            if let Some(engine) = running_engine(connection) {
                engine.pause(now_ms());
            }
            true
        }
        ParsedClientMessage::Resume => {
            if let Some(engine) = running_engine(connection) {
                engine.resume(now_ms());
            }
            true
        }
        ParsedClientMessage::Resize {
            cell_size,
            viewport,
        } => {
            if let Some(engine) = running_engine(connection) {
                let grid = engine.grid();
                let next = resolve_cell_size(cell_size, viewport, grid.rows(), grid.cols());
                engine.set_cell_size(next);
            }
            true
        }
        ParsedClientMessage::Leave => {
            if let Some(mut session) = connection.session.take() {
                session.teardown();
            }
            true
        }
        ParsedClientMessage::Ping { t } => send_json(
            connection,
            &json!({
                "type": "pong",
                "t": t,
            }),
            QueuePolicy::DisconnectOnFull,
        ),
    }
}

fn running_engine(connection: &mut Connection) -> Option<&mut GameEngine> {
    connection.session.as_mut()?.engine_mut()
}

async fn start_level(
    connection: &mut Connection,
    level: u32,
    seed: Option<u32>,
    cell_size: Option<f64>,
    viewport: Option<Viewport>,
) -> bool {
    if let Some(mut previous) = connection.session.take() {
        previous.teardown();
    }
    connection.session = Some(LevelSession::loading(level));
    if !send_json(
        connection,
        &json!({ "type": "loading", "level": level }),
        QueuePolicy::DisconnectOnFull,
    ) {
        return false;
    }

    let loaded = load_descriptor(&connection.config, level).await;
    let resolved_cell_size = match &loaded {
        Ok(descriptor) => resolve_cell_size(cell_size, viewport, descriptor.rows, descriptor.cols),
        Err(_) => resolve_cell_size(cell_size, None, 0, 0),
    };
    let options = EngineOptions {
        cell_size: resolved_cell_size,
        seed: seed.unwrap_or_else(|| rand::rng().random()),
        ..EngineOptions::default()
    };

    let Some(session) = connection.session.as_mut() else {
        return true;
    };
    match session.finish_loading(loaded, options, now_ms()) {
        Ok(world) => send_json(
            connection,
            &json!({
                "type": "world_init",
                "cellSize": resolved_cell_size,
                "world": world,
            }),
            QueuePolicy::DisconnectOnFull,
        ),
        Err(error) => send_json(
            connection,
            &json!({
                "type": "load_failed",
                "level": level,
                "message": error.to_string(),
            }),
            QueuePolicy::DisconnectOnFull,
        ),
    }
}

async fn load_descriptor(
    config: &ServerConfig,
    level: u32,
) -> Result<LevelDescriptor, LevelLoadError> {
    let path = level_file_path(&config.levels_dir, level);
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|error| LevelLoadError::Io {
            path: path.to_string_lossy().to_string(),
            message: error.to_string(),
        })?;
    let mut descriptor = LevelDescriptor::from_json(&raw)?;
    descriptor.level = level;
    Ok(descriptor)
}

/// Returns false when the connection should be closed.
fn tick_session(connection: &mut Connection) -> bool {
    let Some(session) = connection.session.as_mut() else {
        return true;
    };
    let Some(snapshot) = session.tick(now_ms()) else {
        return true;
    };
    let status = snapshot.status;
    if !send_json(
        connection,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DropOnFull,
    ) {
        return false;
    }

    let finished = match status {
        LevelStatus::Completed => {
            let completion = connection
                .session
                .as_ref()
                .and_then(|session| session.engine())
                .and_then(|engine| engine.completion().cloned());
            Some(json!({
                "type": "level_complete",
                "completion": completion,
            }))
        }
        LevelStatus::Failed => {
            let engine = connection.session.as_ref().and_then(|session| session.engine());
            Some(json!({
                "type": "level_failed",
                "level": engine.map(|engine| engine.level()),
                "score": engine.map(|engine| engine.score()),
            }))
        }
        _ => None,
    };
    let Some(message) = finished else {
        return true;
    };
    if let Some(mut session) = connection.session.take() {
        session.teardown();
    }
    send_json(connection, &message, QueuePolicy::DisconnectOnFull)
}

fn send_json(connection: &Connection, message: &Value, policy: QueuePolicy) -> bool {
    let send_failed = connection
        .tx
        .try_send(OutboundMessage::Text(message.to_string()))
        .is_err();
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        warn!(client = %connection.id, "outbound queue full; closing connection");
        let _ = connection.tx.try_send(OutboundMessage::Close {
            code: 1013,
            reason: "outbound queue full".to_string(),
        });
        return false;
    }
    true
}

fn send_error(connection: &Connection, message: &str) -> bool {
    send_json(
        connection,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    )
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}
