//! WebSocket gateway: the duplex channel between clients and rooms.
//!
//! Each socket gets a [`dispatch::Session`] and an outbound queue in the
//! [`hub::ConnectionHub`]. A single task per socket multiplexes inbound
//! frames, queued notifications and heartbeats.

pub mod dispatch;
pub mod hub;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::{Router, routing::get};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::state::AppState;
use dispatch::{INVALID_MESSAGE_CODE, Session};

/// Largest inbound message accepted, in bytes.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Heartbeat periods without any inbound frame after which a connection is
/// closed.
pub const MISSED_HEARTBEATS_BEFORE_CLOSE: u32 = 3;

/// Query parameters of the upgrade request.
#[derive(Debug, Deserialize)]
pub struct GatewayParams {
    /// The authenticated user opening the connection.
    pub user_id: Uuid,
}

/// GET /api/v1/gateway?user_id=...
#[instrument(skip(state, ws), fields(user_id = %params.user_id))]
async fn upgrade(
    State(state): State<AppState>,
    Query(params): Query<GatewayParams>,
    ws: WebSocketUpgrade,
) -> Response {
    info!("upgrading gateway connection");
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| run_connection(state, params.user_id, socket))
}

/// Returns the gateway router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(upgrade))
}

async fn run_connection(state: AppState, user_id: Uuid, mut socket: WebSocket) {
    let session = Session::new(user_id, Uuid::new_v4());
    let mut outbound = state.hub.register(session.connection_id, user_id);

    let mut heartbeat = tokio::time::interval(state.heartbeat_interval);
    heartbeat.reset();
    let silence_limit = state.heartbeat_interval * MISSED_HEARTBEATS_BEFORE_CLOSE;
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if last_seen.elapsed() > silence_limit {
                    warn!(connection_id = %session.connection_id, "heartbeat timeout, closing");
                    break;
                }
                if socket.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    break;
                };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                let Some(Ok(message)) = inbound else {
                    break;
                };
                last_seen = Instant::now();
                match message {
                    Message::Text(raw) => session.handle_frame(&state, raw.as_str()).await,
                    Message::Binary(_) => session.reject(
                        &state,
                        INVALID_MESSAGE_CODE,
                        "binary frames are not supported".to_owned(),
                    ),
                    Message::Ping(_) | Message::Pong(_) => {}
                    Message::Close(_) => break,
                }
            }
        }
    }

    session.close(&state).await;
    debug!(connection_id = %session.connection_id, user_id = %user_id, "gateway connection closed");
}
