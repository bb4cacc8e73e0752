//! Routes for creating and inspecting rooms.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use cinesync_protocol::events::RoomStatePayload;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use cinesync_rooms::application::{command_handlers, query_handlers};
use cinesync_rooms::domain::commands;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    /// The user who will own the room.
    pub owner_id: Uuid,
    /// The media to watch.
    pub media_id: Uuid,
    /// Whether joining requires a code.
    #[serde(default)]
    pub private: bool,
}

/// Response body for a created room.
#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    /// The new room.
    pub room_id: Uuid,
    /// The join code, for private rooms.
    pub code: Option<String>,
}

/// POST /
#[instrument(skip(state, request), fields(owner_id = %request.owner_id, media_id = %request.media_id))]
async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    let command = commands::CreateRoom {
        correlation_id: Uuid::new_v4(),
        owner_id: request.owner_id,
        media_id: request.media_id,
        private: request.private,
    };

    info!(correlation_id = %command.correlation_id, "handling create_room command");

    let created = command_handlers::handle_create_room(&command, &state.rooms).await?;

    Ok(Json(CreateRoomResponse {
        room_id: created.room_id,
        code: created.code,
    }))
}

/// GET /{room_id}
#[instrument(skip(state))]
async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<RoomStatePayload>, ApiError> {
    let payload = query_handlers::get_room_state(
        room_id,
        &state.rooms.store,
        state.rooms.message_history_limit,
    )
    .await?;

    Ok(Json(payload))
}

/// Returns the router for rooms.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_room))
        .route("/{room_id}", get(get_room))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use cinesync_core::clock::Clock;
    use cinesync_core::repository::RoomRepository;
    use cinesync_rooms::application::command_handlers::RoomContext;
    use cinesync_rooms::application::retry::RetryPolicy;
    use cinesync_rooms::application::room_store::{RoomStore, RoomStoreConfig};
    use cinesync_rooms::domain::aggregates::RoomSettings;
    use cinesync_test_support::{
        FailingRoomRepository, FixedClock, InMemoryMessageRepository, InMemoryRoomRepository,
        SequenceRng, StaticMediaCatalog, StaticUserDirectory,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::gateway::hub::ConnectionHub;

    struct Fixture {
        state: AppState,
        owner_id: Uuid,
        media_id: Uuid,
    }

    fn fixture_with(rooms: Arc<dyn RoomRepository>) -> Fixture {
        let mut users = StaticUserDirectory::new();
        let owner_id = users.add("Owen").user_id;
        let media_id = Uuid::new_v4();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        ));
        let config = RoomStoreConfig {
            retry: RetryPolicy::none(),
            ..RoomStoreConfig::default()
        };
        let store = RoomStore::new(
            rooms,
            Arc::new(InMemoryMessageRepository::new()),
            clock.clone(),
            config,
        );
        let hub = Arc::new(ConnectionHub::new());
        let ctx = RoomContext {
            store,
            users: Arc::new(users),
            media: Arc::new(StaticMediaCatalog::with_ready([media_id])),
            transport: hub.clone(),
            clock,
            rng: Arc::new(Mutex::new(SequenceRng::new(vec![0, 1, 2, 3, 4, 5]))),
            settings: RoomSettings::default(),
            message_history_limit: 50,
        };
        Fixture {
            state: AppState::new(ctx, hub, Duration::from_secs(15)),
            owner_id,
            media_id,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(InMemoryRoomRepository::new()))
    }

    fn post_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_public_room_returns_200_without_code() {
        // Arrange
        let f = fixture();
        let app = router().with_state(f.state);
        let body = serde_json::json!({ "owner_id": f.owner_id, "media_id": f.media_id });

        // Act
        let response = app.oneshot(post_request(&body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        Uuid::parse_str(json["room_id"].as_str().unwrap()).unwrap();
        assert!(json["code"].is_null());
    }

    #[tokio::test]
    async fn test_create_private_room_returns_code() {
        // Arrange
        let f = fixture();
        let app = router().with_state(f.state);
        let body = serde_json::json!({
            "owner_id": f.owner_id,
            "media_id": f.media_id,
            "private": true
        });

        // Act
        let response = app.oneshot(post_request(&body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["code"], "ABCDEF");
    }

    #[tokio::test]
    async fn test_create_room_for_unknown_owner_returns_404() {
        // Arrange
        let f = fixture();
        let app = router().with_state(f.state);
        let body = serde_json::json!({ "owner_id": Uuid::new_v4(), "media_id": f.media_id });

        // Act
        let response = app.oneshot(post_request(&body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "user_not_found");
    }

    #[tokio::test]
    async fn test_create_room_for_unready_media_returns_503() {
        // Arrange
        let f = fixture();
        let app = router().with_state(f.state);
        let body = serde_json::json!({ "owner_id": f.owner_id, "media_id": Uuid::new_v4() });

        // Act
        let response = app.oneshot(post_request(&body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["error"], "media_not_available");
    }

    #[tokio::test]
    async fn test_create_room_returns_422_for_missing_fields() {
        // Arrange
        let app = router().with_state(fixture().state);

        // Act
        let response = app
            .oneshot(post_request(&serde_json::json!({})))
            .await
            .unwrap();

        // Assert - Axum returns 422 for deserialization failures.
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_create_room_returns_500_when_repository_fails() {
        // Arrange
        let f = fixture_with(Arc::new(FailingRoomRepository));
        let app = router().with_state(f.state);
        let body = serde_json::json!({ "owner_id": f.owner_id, "media_id": f.media_id });

        // Act
        let response = app.oneshot(post_request(&body)).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "infrastructure_error");
    }

    #[tokio::test]
    async fn test_get_missing_room_returns_404() {
        // Arrange
        let app = router().with_state(fixture().state);
        let request = Request::builder()
            .method("GET")
            .uri(format!("/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "room_not_found");
    }

    #[tokio::test]
    async fn test_get_room_with_malformed_id_returns_400() {
        // Arrange
        let app = router().with_state(fixture().state);
        let request = Request::builder()
            .method("GET")
            .uri("/not-a-uuid")
            .body(Body::empty())
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
