//! Integration tests for the room routes.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_create_room_then_get_state_round_trip() {
    let app = common::build_test_app();

    // POST /api/v1/rooms
    let (room_id, code) = app.create_room(false).await;
    assert!(code.is_none());

    // GET /api/v1/rooms/{room_id} - verify persisted state
    let (status, json) = common::get_json(app.router(), &format!("/api/v1/rooms/{room_id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["roomId"], room_id.to_string());
    assert_eq!(json["ownerId"], app.owner.user_id.to_string());
    assert_eq!(json["isPrivate"], false);
    assert_eq!(json["capacity"], 10);
    let viewers = json["viewers"].as_array().unwrap();
    assert_eq!(viewers.len(), 1);
    assert_eq!(viewers[0]["name"], "Owen");
    assert_eq!(viewers[0]["online"], false);
    assert_eq!(viewers[0]["isOwner"], true);
    assert_eq!(json["playback"]["paused"], true);
    assert!(json["messages"].as_array().unwrap().is_empty());
    assert_eq!(app.rooms.snapshot(room_id).unwrap().version, 1);
}

#[tokio::test]
async fn test_private_room_state_hides_code() {
    let app = common::build_test_app();
    let (room_id, code) = app.create_room(true).await;
    assert_eq!(code.as_deref(), Some("ABCDEF"));

    let (status, json) = common::get_json(app.router(), &format!("/api/v1/rooms/{room_id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isPrivate"], true);
    assert!(json.get("code").is_none());
}

#[tokio::test]
async fn test_get_nonexistent_room_returns_404() {
    let app = common::build_test_app();
    let room_id = Uuid::new_v4();

    let (status, json) = common::get_json(app.router(), &format!("/api/v1/rooms/{room_id}")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "room_not_found");
}

#[tokio::test]
async fn test_create_room_for_unknown_owner_returns_404() {
    let app = common::build_test_app();

    let (status, json) = common::post_json(
        app.router(),
        "/api/v1/rooms",
        &json!({ "owner_id": Uuid::new_v4(), "media_id": app.media_id }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "user_not_found");
}

#[tokio::test]
async fn test_room_state_includes_chat_history() {
    let app = common::build_test_app();
    let (room_id, _) = app.create_room(false).await;
    let mut owner = app.open(&app.owner);
    owner
        .send(&app, &json!({ "Connect": { "roomId": room_id } }))
        .await;
    owner
        .send(&app, &json!({ "SendMessage": { "text": "popcorn ready" } }))
        .await;
    owner.drain();

    let (status, json) = common::get_json(app.router(), &format!("/api/v1/rooms/{room_id}")).await;

    assert_eq!(status, StatusCode::OK);
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "popcorn ready");
    assert_eq!(json["viewers"][0]["online"], true);
}
