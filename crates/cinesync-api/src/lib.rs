//! CineSync API server library.
//!
//! Exposes the router, configuration and gateway so the binary and the
//! integration tests assemble the same application.

pub mod config;
pub mod error;
pub mod eviction;
pub mod gateway;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the application router with every route mounted.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/rooms", routes::rooms::router())
        .nest("/api/v1/gateway", gateway::router())
        .with_state(state)
}
