use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fire_rescue::config::GameConfig;
use fire_rescue::engine::GameEngine;
use fire_rescue::error::CommandError;
use fire_rescue::server_protocol::{
    failure_body, parse_client_message, parse_coords, ParsedClientMessage,
};
use fire_rescue::server_utils::{parse_layout_path, parse_port, parse_seed};
use fire_rescue::types::{GameEvent, PoiReport, StepReport};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

const DEFAULT_LOG_FILTER: &str = "fire_rescue=info,server=info,tower_http=info";
const CLIENT_QUEUE: usize = 256;

type SharedState = Arc<Mutex<ServerState>>;

struct ServerState {
    engine: GameEngine,
    fixed_seed: Option<u32>,
    clients: HashMap<String, mpsc::Sender<String>>,
}

impl ServerState {
    fn new(engine: GameEngine, fixed_seed: Option<u32>) -> Self {
        Self {
            engine,
            fixed_seed,
            clients: HashMap::new(),
        }
    }

    fn step(&mut self) -> StepReport {
        let report = self.engine.step();
        self.publish("step", &report.events);
        report
    }

    fn reset(&mut self, seed: Option<u32>) -> Value {
        let seed = seed
            .or(self.fixed_seed)
            .unwrap_or_else(rand::random::<u32>);
        self.engine.reset(seed);
        info!(seed, "game reset");
        let events = self.engine.drain_events();
        self.publish("reset", &events);
        json!({
            "success": true,
            "seed": seed,
            "gameState": self.engine.game_state(),
        })
    }

    fn publish_pending(&mut self) {
        let events = self.engine.drain_events();
        if !events.is_empty() {
            self.publish("events", &events);
        }
    }

    fn publish(&mut self, kind: &str, events: &[GameEvent]) {
        if self.clients.is_empty() {
            return;
        }
        let payload = json!({
            "type": kind,
            "step": self.engine.step_count(),
            "events": events,
        })
        .to_string();
        self.clients
            .retain(|client_id, tx| match tx.try_send(payload.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%client_id, "client queue full, dropping event batch");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
    }

    fn fires_body(&self) -> Value {
        json!({ "fires": self.engine.fires() })
    }

    fn smoke_body(&self) -> Value {
        json!({ "smoke": self.engine.smoke() })
    }

    fn pois_body(&self) -> Value {
        json!({ "pois": self.engine.poi_views() })
    }

    fn agents_body(&self) -> Value {
        json!({ "agents": self.engine.firefighters() })
    }

    fn walls_body(&self) -> Value {
        json!({ "walls": self.engine.walls() })
    }

    fn game_state_body(&self) -> Value {
        json!({ "gameState": self.engine.game_state() })
    }

    fn snapshot(&self) -> Value {
        json!({
            "type": "snapshot",
            "seed": self.engine.seed(),
            "gameState": self.engine.game_state(),
            "fires": self.engine.fires(),
            "smoke": self.engine.smoke(),
            "pois": self.engine.poi_views(),
            "agents": self.engine.firefighters(),
            "walls": self.engine.walls(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CoordsInput {
    x: Option<String>,
    y: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let port = parse_port(std::env::var("PORT").ok().as_deref());
    let fixed_seed = parse_seed(std::env::var("FIRE_RESCUE_SEED").ok().as_deref());
    let layout_path = parse_layout_path(std::env::var("FIRE_RESCUE_LAYOUT").ok().as_deref());

    let config = match GameConfig::load_or_default(layout_path.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "failed to load board layout");
            std::process::exit(1);
        }
    };
    let seed = fixed_seed.unwrap_or_else(rand::random::<u32>);
    info!(
        seed,
        width = config.width(),
        height = config.height(),
        firefighters = config.firefighter_count,
        "starting game"
    );
    let state = Arc::new(Mutex::new(ServerState::new(
        GameEngine::new(config, seed),
        fixed_seed,
    )));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/step", post(step_handler))
        .route("/api/reset", post(reset_handler))
        .route("/api/fires", get(fires_handler))
        .route("/api/smoke", get(smoke_handler))
        .route("/api/pois", get(pois_handler))
        .route("/api/agents", get(agents_handler))
        .route("/api/walls", get(walls_handler))
        .route("/api/gamestate", get(game_state_handler))
        .route("/api/reveal_poi", post(reveal_poi_handler))
        .route("/api/check_poi_in_fire", get(check_poi_in_fire_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            error!(%error, %bind_addr, "failed to bind server socket");
            std::process::exit(1);
        }
    };

    info!("listening on :{port}");
    if let Err(error) = axum::serve(listener, app).await {
        error!(%error, "server runtime failed");
        std::process::exit(1);
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn step_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let mut guard = state.lock().await;
    Json(guard.step())
}

async fn reset_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let mut guard = state.lock().await;
    Json(guard.reset(None))
}

async fn fires_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.fires_body())
}

async fn smoke_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.smoke_body())
}

async fn pois_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.pois_body())
}

async fn agents_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.agents_body())
}

async fn walls_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.walls_body())
}

async fn game_state_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.game_state_body())
}

async fn reveal_poi_handler(
    State(state): State<SharedState>,
    Form(input): Form<CoordsInput>,
) -> Response {
    let cell = match parse_coords(input.x.as_deref(), input.y.as_deref()) {
        Ok(cell) => cell,
        Err(error) => return command_failure(&error),
    };
    let mut guard = state.lock().await;
    let result = guard.engine.reveal_at(cell);
    guard.publish_pending();
    command_response(result)
}

async fn check_poi_in_fire_handler(
    State(state): State<SharedState>,
    Query(input): Query<CoordsInput>,
) -> Response {
    let cell = match parse_coords(input.x.as_deref(), input.y.as_deref()) {
        Ok(cell) => cell,
        Err(error) => return command_failure(&error),
    };
    let mut guard = state.lock().await;
    let result = guard.engine.check_and_resolve_fire_at_poi(cell);
    guard.publish_pending();
    command_response(result)
}

fn command_response(result: Result<PoiReport, CommandError>) -> Response {
    match result {
        Ok(report) => Json(report).into_response(),
        Err(error) => command_failure(&error),
    }
}

fn command_failure(error: &CommandError) -> Response {
    let status = match error {
        CommandError::MissingCoordinate(_)
        | CommandError::InvalidCoordinate { .. }
        | CommandError::OutOfBounds { .. } => StatusCode::BAD_REQUEST,
        CommandError::NoPoi { .. } => StatusCode::NOT_FOUND,
        CommandError::AlreadyRevealed { .. } | CommandError::GameOver => StatusCode::CONFLICT,
    };
    (status, Json(failure_body(error))).into_response()
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<String>(CLIENT_QUEUE);

    {
        let mut guard = state.lock().await;
        let snapshot = guard.snapshot().to_string();
        let _ = tx.try_send(snapshot);
        guard.clients.insert(client_id.clone(), tx.clone());
    }
    debug!(%client_id, "client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&state, &client_id, raw.as_str()).await;
            }
            Message::Binary(raw) => match std::str::from_utf8(&raw) {
                Ok(text) => handle_client_message(&state, &client_id, text).await,
                Err(_) => send_to_client(&state, &client_id, error_payload("invalid utf8 message")).await,
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.lock().await.clients.remove(&client_id);
    debug!(%client_id, "client disconnected");
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: &SharedState, client_id: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        send_to_client(state, client_id, error_payload("invalid message")).await;
        return;
    };

    let reply = {
        let mut guard = state.lock().await;
        match message {
            ParsedClientMessage::Step => {
                let report = guard.step();
                json!({ "type": "step_result", "report": report })
            }
            ParsedClientMessage::Reset { seed } => {
                json!({ "type": "reset_result", "result": guard.reset(seed) })
            }
            ParsedClientMessage::RevealPoi { cell } => {
                let result = guard.engine.reveal_at(cell);
                guard.publish_pending();
                command_payload("reveal_result", result)
            }
            ParsedClientMessage::CheckPoiInFire { cell } => {
                let result = guard.engine.check_and_resolve_fire_at_poi(cell);
                guard.publish_pending();
                command_payload("fire_check_result", result)
            }
        }
    };
    send_to_client(state, client_id, reply).await;
}

fn command_payload(kind: &str, result: Result<PoiReport, CommandError>) -> Value {
    match result {
        Ok(report) => json!({ "type": kind, "result": report }),
        Err(error) => json!({ "type": kind, "result": failure_body(&error) }),
    }
}

fn error_payload(message: &str) -> Value {
    json!({ "type": "error", "message": message })
}

async fn send_to_client(state: &SharedState, client_id: &str, payload: Value) {
    let tx = state.lock().await.clients.get(client_id).cloned();
    if let Some(tx) = tx {
        let _ = tx.send(payload.to_string()).await;
    }
}

fn make_id(prefix: &str) -> String {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fire_rescue::types::Cell;

    fn test_state() -> ServerState {
        ServerState::new(GameEngine::new(GameConfig::default(), 11), Some(11))
    }

    #[test]
    fn query_bodies_wrap_their_lists_under_a_named_key() {
        let state = test_state();
        let bodies = [
            ("fires", state.fires_body()),
            ("smoke", state.smoke_body()),
            ("pois", state.pois_body()),
            ("agents", state.agents_body()),
            ("walls", state.walls_body()),
        ];
        for (key, body) in bodies {
            assert!(body.is_object(), "{key} body should be an object");
            assert!(body[key].is_array(), "{key} body should hold an array");
        }
        assert_eq!(state.fires_body()["fires"].as_array().map(Vec::len), Some(3));
        assert_eq!(state.agents_body()["agents"].as_array().map(Vec::len), Some(5));
    }

    #[test]
    fn game_state_body_nests_the_state() {
        let state = test_state();
        let body = state.game_state_body();
        assert_eq!(body["gameState"]["phase"], json!(state.engine.game_state().phase));
        assert_eq!(body["gameState"]["damageCount"], 0);
    }

    #[test]
    fn reset_uses_the_fixed_seed_when_none_is_given() {
        let mut state = test_state();
        state.step();
        let body = state.reset(None);
        assert_eq!(body["success"], true);
        assert_eq!(body["seed"], 11);
        assert_eq!(body["gameState"]["step"], 0);
        assert_eq!(state.snapshot()["seed"], 11);

        let body = state.reset(Some(99));
        assert_eq!(body["seed"], 99);
        assert_eq!(state.engine.seed(), 99);
    }

    #[test]
    fn command_failures_map_to_status_codes() {
        let cell = Cell::new(9, 9);
        let cases = [
            (CommandError::MissingCoordinate("x"), StatusCode::BAD_REQUEST),
            (
                CommandError::InvalidCoordinate {
                    field: "y",
                    raw: "up".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (CommandError::out_of_bounds(cell), StatusCode::BAD_REQUEST),
            (CommandError::no_poi(cell), StatusCode::NOT_FOUND),
            (CommandError::already_revealed(cell), StatusCode::CONFLICT),
            (CommandError::GameOver, StatusCode::CONFLICT),
        ];
        for (error, status) in cases {
            assert_eq!(command_failure(&error).status(), status, "{error}");
        }
    }

    #[test]
    fn rejected_command_payload_carries_a_failure_body() {
        let payload = command_payload("reveal_result", Err(CommandError::GameOver));
        assert_eq!(payload["type"], "reveal_result");
        assert_eq!(payload["result"]["success"], false);
        assert_eq!(payload["result"]["message"], "game is over");
    }
}
