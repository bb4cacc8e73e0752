//! Outbound notification events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope key names of every notification kind.
pub mod kinds {
    /// [`super::NotificationEvent::Join`]
    pub const JOIN: &str = "JoinNotificationEvent";
    /// [`super::NotificationEvent::Leave`]
    pub const LEAVE: &str = "LeaveNotificationEvent";
    /// [`super::NotificationEvent::Kick`]
    pub const KICK: &str = "KickNotificationEvent";
    /// [`super::NotificationEvent::Beep`]
    pub const BEEP: &str = "BeepNotificationEvent";
    /// [`super::NotificationEvent::Scream`]
    pub const SCREAM: &str = "ScreamNotificationEvent";
    /// [`super::NotificationEvent::Delete`]
    pub const DELETE: &str = "DeleteNotificationEvent";
    /// [`super::NotificationEvent::Error`]
    pub const ERROR: &str = "ErrorNotificationEvent";
    /// [`super::NotificationEvent::Presence`]
    pub const PRESENCE: &str = "PresenceNotificationEvent";
    /// [`super::NotificationEvent::Message`]
    pub const MESSAGE: &str = "MessageNotificationEvent";
    /// [`super::NotificationEvent::Pause`]
    pub const PAUSE: &str = "PauseNotificationEvent";
    /// [`super::NotificationEvent::TimeLine`]
    pub const TIME_LINE: &str = "TimeLineNotificationEvent";
    /// [`super::NotificationEvent::Episode`]
    pub const EPISODE: &str = "EpisodeNotificationEvent";
    /// [`super::NotificationEvent::Speed`]
    pub const SPEED: &str = "SpeedNotificationEvent";
    /// [`super::NotificationEvent::Fullscreen`]
    pub const FULLSCREEN: &str = "FullscreenNotificationEvent";
    /// [`super::NotificationEvent::Sync`]
    pub const SYNC: &str = "SyncNotificationEvent";
}

/// A viewer entered the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinNotification {
    /// The joining user.
    pub initiator: Uuid,
    /// Display name of the joining user.
    pub name: String,
    /// Avatar reference of the joining user.
    pub photo_ref: Option<String>,
}

/// A viewer left the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveNotification {
    /// The leaving user.
    pub initiator: Uuid,
}

/// The owner removed and banned a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickNotification {
    /// The owner.
    pub initiator: Uuid,
    /// The kicked user.
    pub target: Uuid,
}

/// A viewer nudged another viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeepNotification {
    /// The sender.
    pub initiator: Uuid,
    /// The recipient.
    pub target: Uuid,
}

/// A viewer screamed at another viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreamNotification {
    /// The sender.
    pub initiator: Uuid,
    /// The recipient.
    pub target: Uuid,
}

/// The room was closed and will accept no further commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNotification {
    /// The owner whose departure closed the room.
    pub initiator: Uuid,
    /// The closed room.
    pub room_id: Uuid,
}

/// A command issued by this connection failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotification {
    /// The user whose command failed.
    pub initiator: Uuid,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

/// A viewer's connection state changed without them joining or leaving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceNotification {
    /// The viewer.
    pub initiator: Uuid,
    /// Whether the viewer is now online.
    pub online: bool,
}

/// A chat message was posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageNotification {
    /// The author.
    pub initiator: Uuid,
    /// Message identifier.
    pub message_id: Uuid,
    /// Normalized text.
    pub text: String,
    /// Send time.
    pub sent_at: DateTime<Utc>,
}

/// Playback was paused or resumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseNotification {
    /// The viewer who changed playback.
    pub initiator: Uuid,
    /// New paused flag.
    pub paused: bool,
    /// Position at which the change happened.
    pub position_ticks: i64,
}

/// Playback jumped to a new position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLineNotification {
    /// The viewer who seeked.
    pub initiator: Uuid,
    /// New position.
    pub position_ticks: i64,
}

/// A different episode was selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeNotification {
    /// The viewer who switched episodes.
    pub initiator: Uuid,
    /// Selected season.
    pub season: i32,
    /// Selected episode.
    pub episode: i32,
}

/// The playback rate changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedNotification {
    /// The viewer who changed the rate.
    pub initiator: Uuid,
    /// New rate.
    pub speed: f32,
}

/// The fullscreen flag changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullscreenNotification {
    /// The viewer who toggled fullscreen.
    pub initiator: Uuid,
    /// New flag.
    pub fullscreen: bool,
}

/// Full room state, sent in reply to a sync request or after joining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncNotification {
    /// The user the snapshot was produced for.
    pub initiator: Uuid,
    /// The room state.
    pub state: RoomStatePayload,
}

/// Viewer entry of a room state payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerPayload {
    /// The viewer's user id.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Avatar reference.
    pub photo_ref: Option<String>,
    /// Whether the viewer has a live connection.
    pub online: bool,
    /// Whether the viewer owns the room.
    pub is_owner: bool,
}

/// Playback section of a room state payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPayload {
    /// Whether playback is paused.
    pub paused: bool,
    /// Position in 100ns ticks.
    pub position_ticks: i64,
    /// Selected season.
    pub season: Option<i32>,
    /// Selected episode.
    pub episode: Option<i32>,
    /// Playback rate.
    pub speed: f32,
    /// Fullscreen flag.
    pub fullscreen: bool,
}

/// Chat history entry of a room state payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    /// Message identifier.
    pub message_id: Uuid,
    /// Author.
    pub user_id: Uuid,
    /// Normalized text.
    pub text: String,
    /// Send time.
    pub sent_at: DateTime<Utc>,
}

/// Everything a client needs to render a room from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatePayload {
    /// Room identifier.
    pub room_id: Uuid,
    /// Owner's user id.
    pub owner_id: Uuid,
    /// Media being watched.
    pub media_id: Uuid,
    /// Whether joining requires a code.
    pub is_private: bool,
    /// Maximum number of viewers.
    pub capacity: usize,
    /// Current viewers.
    pub viewers: Vec<ViewerPayload>,
    /// Shared playback state.
    pub playback: PlaybackPayload,
    /// Recent chat history, oldest first.
    pub messages: Vec<ChatMessagePayload>,
}

/// Every notification the server can push to a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    /// See [`JoinNotification`].
    Join(JoinNotification),
    /// See [`LeaveNotification`].
    Leave(LeaveNotification),
    /// See [`KickNotification`].
    Kick(KickNotification),
    /// See [`BeepNotification`].
    Beep(BeepNotification),
    /// See [`ScreamNotification`].
    Scream(ScreamNotification),
    /// See [`DeleteNotification`].
    Delete(DeleteNotification),
    /// See [`ErrorNotification`].
    Error(ErrorNotification),
    /// See [`PresenceNotification`].
    Presence(PresenceNotification),
    /// See [`MessageNotification`].
    Message(MessageNotification),
    /// See [`PauseNotification`].
    Pause(PauseNotification),
    /// See [`TimeLineNotification`].
    TimeLine(TimeLineNotification),
    /// See [`EpisodeNotification`].
    Episode(EpisodeNotification),
    /// See [`SpeedNotification`].
    Speed(SpeedNotification),
    /// See [`FullscreenNotification`].
    Fullscreen(FullscreenNotification),
    /// See [`SyncNotification`].
    Sync(SyncNotification),
}

impl NotificationEvent {
    /// The envelope key for this event.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join(_) => kinds::JOIN,
            Self::Leave(_) => kinds::LEAVE,
            Self::Kick(_) => kinds::KICK,
            Self::Beep(_) => kinds::BEEP,
            Self::Scream(_) => kinds::SCREAM,
            Self::Delete(_) => kinds::DELETE,
            Self::Error(_) => kinds::ERROR,
            Self::Presence(_) => kinds::PRESENCE,
            Self::Message(_) => kinds::MESSAGE,
            Self::Pause(_) => kinds::PAUSE,
            Self::TimeLine(_) => kinds::TIME_LINE,
            Self::Episode(_) => kinds::EPISODE,
            Self::Speed(_) => kinds::SPEED,
            Self::Fullscreen(_) => kinds::FULLSCREEN,
            Self::Sync(_) => kinds::SYNC,
        }
    }

    /// The user whose action produced this event.
    #[must_use]
    pub fn initiator(&self) -> Uuid {
        match self {
            Self::Join(e) => e.initiator,
            Self::Leave(e) => e.initiator,
            Self::Kick(e) => e.initiator,
            Self::Beep(e) => e.initiator,
            Self::Scream(e) => e.initiator,
            Self::Delete(e) => e.initiator,
            Self::Error(e) => e.initiator,
            Self::Presence(e) => e.initiator,
            Self::Message(e) => e.initiator,
            Self::Pause(e) => e.initiator,
            Self::TimeLine(e) => e.initiator,
            Self::Episode(e) => e.initiator,
            Self::Speed(e) => e.initiator,
            Self::Fullscreen(e) => e.initiator,
            Self::Sync(e) => e.initiator,
        }
    }

    /// The user a targeted event is aimed at.
    #[must_use]
    pub fn target(&self) -> Option<Uuid> {
        match self {
            Self::Kick(e) => Some(e.target),
            Self::Beep(e) => Some(e.target),
            Self::Scream(e) => Some(e.target),
            _ => None,
        }
    }
}
