use axum::routing::get;
use axum::Router;
use snowfight_server::config::ServerConfig;
use snowfight_server::shard_loop::spawn_shards;
use snowfight_server::ws::{ws_handler, AppState};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid server configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let router = spawn_shards(&config);

    // Axum app
    let app_state = AppState {
        router,
        connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
        max_message_size: config.max_message_size,
        outbox_capacity: config.outbox_capacity,
    };
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    tracing::info!(
        shards = config.shard_count,
        world_width = config.world.width,
        world_height = config.world.height,
        "Starting snowfight server on {}",
        config.listen_addr
    );

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failed to bind {}", config.listen_addr);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
