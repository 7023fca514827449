use axum::{
    extract::{State, WebSocketUpgrade},
    http::Method,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use hyper_util::rt::{TokioExecutor, TokioIo};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod config;
mod game;
mod packets;
mod protocol;
mod shared;
mod transport;

use config::ServerConfig;
use game::constants::{
    BASE_MOVE_SPEED, BOOST_SPEED, GAME_RADIUS, MAX_SNAKE_PARTS, PROTOCOL_VERSION,
    SECTOR_COUNT_ALONG_EDGE, SECTOR_SIZE, SNAKE_ANGULAR_SPEED, SNAKE_TAIL_K,
};
use game::room::Room;
use transport::ws_session::handle_socket;

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    sessions: usize,
    snakes: usize,
    bots: usize,
    frames: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::load();
    tracing::info!(
        game_radius = GAME_RADIUS,
        max_snake_parts = MAX_SNAKE_PARTS,
        sector_size = SECTOR_SIZE,
        sector_count_along_edge = SECTOR_COUNT_ALONG_EDGE,
        base_move_speed = BASE_MOVE_SPEED,
        boost_speed = BOOST_SPEED,
        snake_angular_speed = SNAKE_ANGULAR_SPEED,
        snake_tail_k = SNAKE_TAIL_K,
        protocol_version = PROTOCOL_VERSION,
        bots = config.tuning.bots,
        "world info"
    );

    let room = Arc::new(Room::new(&config));
    room.start();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);
    let app: Router = Router::new()
        .route("/api/health", get(health))
        .route("/slither", get(ws_handler))
        .layer(cors)
        .with_state(room);

    let address = format!("0.0.0.0:{}", config.port);
    tracing::info!("running slither server on {address}");

    let listener = tokio::net::TcpListener::bind(&address).await?;
    loop {
        let (socket, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::warn!(?error, "accept failed");
                continue;
            }
        };
        tracing::debug!(%remote_addr, "connection accepted");
        // The protocol is latency-bound; small packets must not coalesce.
        if let Err(error) = socket.set_nodelay(true) {
            tracing::warn!(?error, %remote_addr, "set_nodelay failed");
        }

        let tower_service = app.clone();
        tokio::spawn(async move {
            let socket = TokioIo::new(socket);
            let hyper_service =
                hyper::service::service_fn(move |request: hyper::Request<hyper::body::Incoming>| {
                    tower_service.clone().oneshot(request)
                });
            if let Err(error) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                .serve_connection_with_upgrades(socket, hyper_service)
                .await
            {
                tracing::debug!(?error, "connection ended with error");
            }
        });
    }
}

async fn health(State(room): State<Arc<Room>>) -> impl IntoResponse {
    let stats = room.stats().await;
    Json(HealthResponse {
        ok: true,
        sessions: stats.sessions,
        snakes: stats.snakes,
        bots: stats.bots,
        frames: stats.frames,
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(room): State<Arc<Room>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, room))
}
