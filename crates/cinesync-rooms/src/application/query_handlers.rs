//! Query handlers for the room context.
//!
//! Queries read the last committed snapshot without taking the room's
//! exclusion, so they may trail an in-flight command.

use cinesync_core::error::DomainError;
use cinesync_core::repository::{RoomSnapshot, StoredMessage};
use cinesync_protocol::events::{
    ChatMessagePayload, PlaybackPayload, RoomStatePayload, ViewerPayload,
};
use uuid::Uuid;

use super::room_store::RoomStore;

/// Builds the client-facing state of a room. The join code is never
/// included.
#[must_use]
pub fn room_state(snapshot: &RoomSnapshot, messages: Vec<StoredMessage>) -> RoomStatePayload {
    RoomStatePayload {
        room_id: snapshot.id,
        owner_id: snapshot.owner_id,
        media_id: snapshot.media_id,
        is_private: snapshot.code.is_some(),
        capacity: snapshot.capacity,
        viewers: snapshot
            .viewers
            .iter()
            .map(|v| ViewerPayload {
                user_id: v.user_id,
                name: v.name.clone(),
                photo_ref: v.photo_ref.clone(),
                online: v.online,
                is_owner: v.user_id == snapshot.owner_id,
            })
            .collect(),
        playback: PlaybackPayload {
            paused: snapshot.playback.paused,
            position_ticks: snapshot.playback.position_ticks,
            season: snapshot.playback.season,
            episode: snapshot.playback.episode,
            speed: snapshot.playback.speed,
            fullscreen: snapshot.playback.fullscreen,
        },
        messages: messages
            .into_iter()
            .map(|m| ChatMessagePayload {
                message_id: m.id,
                user_id: m.user_id,
                text: m.text,
                sent_at: m.sent_at,
            })
            .collect(),
    }
}

/// Retrieves the state of a room with its latest `history_limit` messages.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` if the room does not exist, and
/// repository errors.
pub async fn get_room_state(
    room_id: Uuid,
    store: &RoomStore,
    history_limit: usize,
) -> Result<RoomStatePayload, DomainError> {
    let snapshot = store
        .peek(room_id)
        .await?
        .ok_or(DomainError::RoomNotFound(room_id))?;
    let messages = store.recent_messages(room_id, history_limit).await?;
    Ok(room_state(&snapshot, messages))
}
