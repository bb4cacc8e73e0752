//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use cinesync_core::clock::Clock;
use cinesync_core::collaborators::UserProfile;
use cinesync_protocol::codec::decode_event;
use cinesync_protocol::events::NotificationEvent;
use cinesync_rooms::application::command_handlers::RoomContext;
use cinesync_rooms::application::retry::RetryPolicy;
use cinesync_rooms::application::room_store::{RoomStore, RoomStoreConfig};
use cinesync_rooms::domain::aggregates::RoomSettings;
use cinesync_test_support::{
    FixedClock, InMemoryMessageRepository, InMemoryRoomRepository, SequenceRng,
    StaticMediaCatalog, StaticUserDirectory,
};
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use cinesync_api::build_router;
use cinesync_api::gateway::dispatch::Session;
use cinesync_api::gateway::hub::ConnectionHub;
use cinesync_api::state::AppState;

/// A fully wired application backed by in-memory doubles.
pub struct TestApp {
    pub state: AppState,
    pub rooms: Arc<InMemoryRoomRepository>,
    pub messages: Arc<InMemoryMessageRepository>,
    pub owner: UserProfile,
    pub guest: UserProfile,
    pub stranger: UserProfile,
    pub media_id: Uuid,
}

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the application state with the default room settings.
pub fn build_test_app() -> TestApp {
    build_test_app_with(RoomSettings::default())
}

/// Build the application state with custom room settings.
pub fn build_test_app_with(settings: RoomSettings) -> TestApp {
    let mut users = StaticUserDirectory::new();
    let owner = users.add("Owen");
    let guest = users.add("Gail");
    let stranger = users.add("Sam");
    let media_id = Uuid::new_v4();
    let clock = fixed_clock();
    let rooms = Arc::new(InMemoryRoomRepository::new());
    let messages = Arc::new(InMemoryMessageRepository::new());
    let store = RoomStore::new(
        rooms.clone(),
        messages.clone(),
        clock.clone(),
        RoomStoreConfig {
            retry: RetryPolicy::none(),
            playback_policy: settings.playback_policy,
            ..RoomStoreConfig::default()
        },
    );
    let hub = Arc::new(ConnectionHub::new());
    let ctx = RoomContext {
        store,
        users: Arc::new(users),
        media: Arc::new(StaticMediaCatalog::with_ready([media_id])),
        transport: hub.clone(),
        clock,
        rng: Arc::new(Mutex::new(SequenceRng::new(vec![0, 1, 2, 3, 4, 5]))),
        settings,
        message_history_limit: 50,
    };

    TestApp {
        state: AppState::new(ctx, hub, Duration::from_secs(15)),
        rooms,
        messages,
        owner,
        guest,
        stranger,
        media_id,
    }
}

impl TestApp {
    /// The full router, as mounted by the server binary.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Create a room owned by `owner` through the HTTP surface.
    pub async fn create_room(&self, private: bool) -> (Uuid, Option<String>) {
        let (status, json) = post_json(
            self.router(),
            "/api/v1/rooms",
            &serde_json::json!({
                "owner_id": self.owner.user_id,
                "media_id": self.media_id,
                "private": private
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let room_id = json["room_id"].as_str().unwrap().parse().unwrap();
        let code = json["code"].as_str().map(str::to_owned);
        (room_id, code)
    }

    /// Open a gateway connection for `user` without a socket.
    pub fn open(&self, user: &UserProfile) -> Client {
        let session = Session::new(user.user_id, Uuid::new_v4());
        let inbox = self.state.hub.register(session.connection_id, user.user_id);
        Client { session, inbox }
    }
}

/// A gateway session paired with its outbound queue.
pub struct Client {
    pub session: Session,
    pub inbox: mpsc::UnboundedReceiver<String>,
}

impl Client {
    /// Send one raw frame through the dispatcher.
    pub async fn send(&self, app: &TestApp, frame: &serde_json::Value) {
        self.send_raw(app, &frame.to_string()).await;
    }

    /// Send one raw text frame through the dispatcher.
    pub async fn send_raw(&self, app: &TestApp, raw: &str) {
        self.session.handle_frame(&app.state, raw).await;
    }

    /// Every notification queued so far, decoded.
    pub fn drain(&mut self) -> Vec<NotificationEvent> {
        let mut events = Vec::new();
        while let Ok(frame) = self.inbox.try_recv() {
            events.push(decode_event(&frame).unwrap());
        }
        events
    }

    /// Kinds of every notification queued so far.
    pub fn drain_kinds(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(NotificationEvent::kind).collect()
    }
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
