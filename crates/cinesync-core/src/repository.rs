//! Durable storage contracts and the plain snapshot types they exchange.
//!
//! Snapshots carry no behavior. The room engine rebuilds a validated
//! aggregate from a [`RoomSnapshot`] through an explicit factory, so
//! storage adapters never need access to aggregate internals.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Persisted form of a viewer entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerSnapshot {
    /// The viewer's user id.
    pub user_id: Uuid,
    /// Display name captured at join time.
    pub name: String,
    /// Avatar reference captured at join time.
    pub photo_ref: Option<String>,
    /// Whether the viewer has a live connection.
    pub online: bool,
    /// The viewer's current connection, if online.
    pub connection_id: Option<Uuid>,
}

/// Persisted form of the shared playback state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Whether playback is paused.
    pub paused: bool,
    /// Position in 100ns ticks.
    pub position_ticks: i64,
    /// Selected season, for episodic media.
    pub season: Option<i32>,
    /// Selected episode, for episodic media.
    pub episode: Option<i32>,
    /// Playback rate.
    pub speed: f32,
    /// Whether the owner's player is fullscreen.
    pub fullscreen: bool,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            paused: true,
            position_ticks: 0,
            season: None,
            episode: None,
            speed: 1.0,
            fullscreen: false,
        }
    }
}

/// Persisted form of a room aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Room identifier.
    pub id: Uuid,
    /// The viewer with moderation authority.
    pub owner_id: Uuid,
    /// The media being watched.
    pub media_id: Uuid,
    /// Join code, for private rooms.
    pub code: Option<String>,
    /// Maximum number of viewers.
    pub capacity: usize,
    /// Current viewers, online or not.
    pub viewers: Vec<ViewerSnapshot>,
    /// Users excluded from the room.
    pub banned_users: Vec<Uuid>,
    /// Shared playback state.
    pub playback: PlaybackSnapshot,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last mutating action.
    pub last_activity_at: DateTime<Utc>,
    /// Last event sequence number handed out.
    pub event_sequence: i64,
    /// Number of successful saves.
    pub version: i64,
}

/// Persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Message identifier.
    pub id: Uuid,
    /// Room the message was sent in.
    pub room_id: Uuid,
    /// Author.
    pub user_id: Uuid,
    /// Normalized text.
    pub text: String,
    /// Send time.
    pub sent_at: DateTime<Utc>,
}

/// Durable storage for room snapshots.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Load the persisted snapshot, or `None` if no such room exists.
    async fn load(&self, room_id: Uuid) -> Result<Option<RoomSnapshot>, DomainError>;

    /// Persist `snapshot` if the stored version still equals
    /// `expected_version` (0 means the room must not exist yet).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` on a version mismatch.
    async fn save(&self, snapshot: &RoomSnapshot, expected_version: i64)
    -> Result<(), DomainError>;

    /// Remove the room and its messages. Deleting a missing room succeeds.
    async fn delete(&self, room_id: Uuid) -> Result<(), DomainError>;
}

/// Durable storage for chat messages.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Append a message to the room's history.
    async fn append(&self, message: &StoredMessage) -> Result<(), DomainError>;

    /// The latest `limit` messages of a room, oldest first.
    async fn recent(&self, room_id: Uuid, limit: usize) -> Result<Vec<StoredMessage>, DomainError>;
}
