use axum::{
  extract::{State, WebSocketUpgrade},
  http::Method,
  response::IntoResponse,
  routing::get,
  Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod config;
mod game;
mod protocol;
mod shared;
mod transport;

use config::GameConfig;
use game::room::Room;

#[derive(Clone)]
struct AppState {
  room: Arc<Room>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
  ok: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let config = Arc::new(GameConfig::load()?);
  tracing::info!(
    game_radius = config.game_radius,
    game_mode = config.game_mode,
    protocol = config.default_protocol_version,
    "config loaded"
  );

  let state = Arc::new(AppState {
    room: Arc::new(Room::new(Arc::clone(&config))),
  });

  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET])
    .allow_headers(Any);

  let app = Router::new()
    .route("/api/health", get(health))
    .route("/slither", get(ws_handler))
    .route("/", get(ws_handler))
    .layer(cors)
    .with_state(state);

  let address = format!("0.0.0.0:{}", config.port);
  tracing::info!("listening on {address}");

  let listener = tokio::net::TcpListener::bind(&address).await?;
  axum::serve(listener, app).await?;

  Ok(())
}

async fn health() -> impl IntoResponse {
  Json(HealthResponse { ok: true })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let room = Arc::clone(&state.room);
  ws.on_upgrade(move |socket| transport::ws_session::handle_socket(socket, room))
}
