//! Domain events for the room context.
//!
//! Room mutations record these on the aggregate. They are drained after the
//! room is persisted and translated into wire notifications; they are never
//! stored themselves.

use chrono::{DateTime, Utc};
use cinesync_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted when a room is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCreated {
    /// The owner.
    pub owner_id: Uuid,
    /// The media being watched.
    pub media_id: Uuid,
}

/// Emitted when a user enters the room, or an offline viewer comes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerJoined {
    /// The joining user.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Avatar reference.
    pub photo_ref: Option<String>,
    /// The connection the user joined on.
    pub connection_id: Uuid,
}

/// Emitted when an online viewer attaches a new connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerReconnected {
    /// The viewer.
    pub user_id: Uuid,
    /// The new connection.
    pub connection_id: Uuid,
}

/// Emitted when a viewer's current connection drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerDisconnected {
    /// The viewer.
    pub user_id: Uuid,
}

/// Emitted when a viewer leaves the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerLeft {
    /// The departed viewer.
    pub user_id: Uuid,
}

/// Emitted when the owner kicks a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerKicked {
    /// The owner.
    pub initiator_id: Uuid,
    /// The kicked and now banned user.
    pub target_id: Uuid,
}

/// Emitted when a chat message is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSent {
    /// Message identifier.
    pub message_id: Uuid,
    /// Author.
    pub user_id: Uuid,
    /// Normalized text.
    pub text: String,
    /// Send time.
    pub sent_at: DateTime<Utc>,
}

/// Emitted when playback is paused or resumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseChanged {
    /// The viewer who changed playback.
    pub initiator_id: Uuid,
    /// New paused flag.
    pub paused: bool,
    /// Position at which the change happened.
    pub position_ticks: i64,
}

/// Emitted when playback seeks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLineChanged {
    /// The viewer who seeked.
    pub initiator_id: Uuid,
    /// New position.
    pub position_ticks: i64,
}

/// Emitted when a different episode is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeChanged {
    /// The viewer who switched.
    pub initiator_id: Uuid,
    /// Selected season.
    pub season: i32,
    /// Selected episode.
    pub episode: i32,
}

/// Emitted when the playback rate changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedChanged {
    /// The viewer who changed the rate.
    pub initiator_id: Uuid,
    /// New rate.
    pub speed: f32,
}

/// Emitted when the fullscreen flag changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullscreenChanged {
    /// The viewer who toggled fullscreen.
    pub initiator_id: Uuid,
    /// New flag.
    pub fullscreen: bool,
}

/// Emitted for beeps and screams; carries no state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerNudged {
    /// The sender.
    pub initiator_id: Uuid,
    /// The recipient.
    pub target_id: Uuid,
}

/// Emitted when the owner's departure closes the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomClosed {
    /// The departed owner.
    pub owner_id: Uuid,
}

/// Event type identifier for [`RoomCreated`].
pub const ROOM_CREATED_EVENT_TYPE: &str = "room.created";
/// Event type identifier for [`ViewerJoined`].
pub const VIEWER_JOINED_EVENT_TYPE: &str = "room.viewer_joined";
/// Event type identifier for [`ViewerReconnected`].
pub const VIEWER_RECONNECTED_EVENT_TYPE: &str = "room.viewer_reconnected";
/// Event type identifier for [`ViewerDisconnected`].
pub const VIEWER_DISCONNECTED_EVENT_TYPE: &str = "room.viewer_disconnected";
/// Event type identifier for [`ViewerLeft`].
pub const VIEWER_LEFT_EVENT_TYPE: &str = "room.viewer_left";
/// Event type identifier for [`ViewerKicked`].
pub const VIEWER_KICKED_EVENT_TYPE: &str = "room.viewer_kicked";
/// Event type identifier for [`MessageSent`].
pub const MESSAGE_SENT_EVENT_TYPE: &str = "room.message_sent";
/// Event type identifier for [`PauseChanged`].
pub const PAUSE_CHANGED_EVENT_TYPE: &str = "room.pause_changed";
/// Event type identifier for [`TimeLineChanged`].
pub const TIME_LINE_CHANGED_EVENT_TYPE: &str = "room.time_line_changed";
/// Event type identifier for [`EpisodeChanged`].
pub const EPISODE_CHANGED_EVENT_TYPE: &str = "room.episode_changed";
/// Event type identifier for [`SpeedChanged`].
pub const SPEED_CHANGED_EVENT_TYPE: &str = "room.speed_changed";
/// Event type identifier for [`FullscreenChanged`].
pub const FULLSCREEN_CHANGED_EVENT_TYPE: &str = "room.fullscreen_changed";
/// Event type identifier for beeps.
pub const BEEPED_EVENT_TYPE: &str = "room.beeped";
/// Event type identifier for screams.
pub const SCREAMED_EVENT_TYPE: &str = "room.screamed";
/// Event type identifier for [`RoomClosed`].
pub const ROOM_CLOSED_EVENT_TYPE: &str = "room.closed";

/// Event payload variants for the room context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoomEventKind {
    /// A room was created.
    RoomCreated(RoomCreated),
    /// A viewer joined or came back online.
    ViewerJoined(ViewerJoined),
    /// An online viewer attached another connection.
    ViewerReconnected(ViewerReconnected),
    /// A viewer went offline.
    ViewerDisconnected(ViewerDisconnected),
    /// A viewer left.
    ViewerLeft(ViewerLeft),
    /// A viewer was kicked and banned.
    ViewerKicked(ViewerKicked),
    /// A chat message was sent.
    MessageSent(MessageSent),
    /// Pause state changed.
    PauseChanged(PauseChanged),
    /// Position changed.
    TimeLineChanged(TimeLineChanged),
    /// Episode changed.
    EpisodeChanged(EpisodeChanged),
    /// Rate changed.
    SpeedChanged(SpeedChanged),
    /// Fullscreen flag changed.
    FullscreenChanged(FullscreenChanged),
    /// A viewer beeped another.
    Beeped(ViewerNudged),
    /// A viewer screamed at another.
    Screamed(ViewerNudged),
    /// The room closed.
    RoomClosed(RoomClosed),
}

impl RoomEventKind {
    /// The event type identifier of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RoomCreated(_) => ROOM_CREATED_EVENT_TYPE,
            Self::ViewerJoined(_) => VIEWER_JOINED_EVENT_TYPE,
            Self::ViewerReconnected(_) => VIEWER_RECONNECTED_EVENT_TYPE,
            Self::ViewerDisconnected(_) => VIEWER_DISCONNECTED_EVENT_TYPE,
            Self::ViewerLeft(_) => VIEWER_LEFT_EVENT_TYPE,
            Self::ViewerKicked(_) => VIEWER_KICKED_EVENT_TYPE,
            Self::MessageSent(_) => MESSAGE_SENT_EVENT_TYPE,
            Self::PauseChanged(_) => PAUSE_CHANGED_EVENT_TYPE,
            Self::TimeLineChanged(_) => TIME_LINE_CHANGED_EVENT_TYPE,
            Self::EpisodeChanged(_) => EPISODE_CHANGED_EVENT_TYPE,
            Self::SpeedChanged(_) => SPEED_CHANGED_EVENT_TYPE,
            Self::FullscreenChanged(_) => FULLSCREEN_CHANGED_EVENT_TYPE,
            Self::Beeped(_) => BEEPED_EVENT_TYPE,
            Self::Screamed(_) => SCREAMED_EVENT_TYPE,
            Self::RoomClosed(_) => ROOM_CLOSED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the room context.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: RoomEventKind,
}

impl DomainEvent for RoomEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
