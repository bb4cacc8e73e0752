//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use cinesync_rooms::application::command_handlers::RoomContext;

use crate::gateway::hub::ConnectionHub;

/// Application state shared across all request handlers and gateway
/// sessions.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Store, collaborators and transport used by the room handlers. Its
    /// transport is `hub`.
    pub rooms: RoomContext,
    /// Live WebSocket connections and room groups.
    pub hub: Arc<ConnectionHub>,
    /// WebSocket ping period.
    pub heartbeat_interval: Duration,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(rooms: RoomContext, hub: Arc<ConnectionHub>, heartbeat_interval: Duration) -> Self {
        Self {
            rooms,
            hub,
            heartbeat_interval,
        }
    }
}
