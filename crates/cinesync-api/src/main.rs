//! CineSync API server entry point.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use cinesync_core::clock::{Clock, SystemClock};
use cinesync_core::rng::SystemRng;
use cinesync_rooms::application::command_handlers::RoomContext;
use cinesync_rooms::application::room_store::RoomStore;
use cinesync_store::pg_directory::{PgMediaAvailability, PgUserLookup};
use cinesync_store::pg_message_repository::PgMessageRepository;
use cinesync_store::pg_room_repository::PgRoomRepository;
use cinesync_store::schema::MIGRATOR;
use axum::http::{Method, header};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use cinesync_api::config::AppConfig;
use cinesync_api::error::AppError;
use cinesync_api::eviction::spawn_idle_eviction;
use cinesync_api::gateway::hub::ConnectionHub;
use cinesync_api::state::AppState;
use cinesync_api::{build_router, telemetry};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    telemetry::init_tracing();

    tracing::info!("Starting CineSync API server");

    let config = AppConfig::from_env()?;

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = RoomStore::new(
        Arc::new(PgRoomRepository::new(pool.clone())),
        Arc::new(PgMessageRepository::new(pool.clone())),
        clock.clone(),
        config.store_config(),
    );
    let hub = Arc::new(ConnectionHub::new());
    let rooms = RoomContext {
        store: store.clone(),
        users: Arc::new(PgUserLookup::new(pool.clone())),
        media: Arc::new(PgMediaAvailability::new(pool)),
        transport: hub.clone(),
        clock,
        rng: Arc::new(Mutex::new(SystemRng)),
        settings: config.room_settings,
        message_history_limit: config.message_history_limit,
    };
    let app_state = AppState::new(rooms, hub, config.heartbeat_interval);

    spawn_idle_eviction(store, config.room_eviction_interval);

    let cors = if config.cors_allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(config.cors_allowed_origins.clone()))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    };
    let app = build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
