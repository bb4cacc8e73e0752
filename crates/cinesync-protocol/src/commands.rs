//! Inbound client commands.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope key names of every client command.
pub mod names {
    /// [`super::ClientCommand::Connect`]
    pub const CONNECT: &str = "Connect";
    /// [`super::ClientCommand::Leave`]
    pub const LEAVE: &str = "Leave";
    /// [`super::ClientCommand::SendMessage`]
    pub const SEND_MESSAGE: &str = "SendMessage";
    /// [`super::ClientCommand::SetPause`]
    pub const SET_PAUSE: &str = "SetPause";
    /// [`super::ClientCommand::SetTimeLine`]
    pub const SET_TIME_LINE: &str = "SetTimeLine";
    /// [`super::ClientCommand::SetEpisode`]
    pub const SET_EPISODE: &str = "SetEpisode";
    /// [`super::ClientCommand::SetSpeed`]
    pub const SET_SPEED: &str = "SetSpeed";
    /// [`super::ClientCommand::SetFullscreen`]
    pub const SET_FULLSCREEN: &str = "SetFullscreen";
    /// [`super::ClientCommand::Beep`]
    pub const BEEP: &str = "Beep";
    /// [`super::ClientCommand::Scream`]
    pub const SCREAM: &str = "Scream";
    /// [`super::ClientCommand::Kick`]
    pub const KICK: &str = "Kick";
    /// [`super::ClientCommand::Sync`]
    pub const SYNC: &str = "Sync";
}

/// Arguments of `Connect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectArgs {
    /// The room to join.
    pub room_id: Uuid,
    /// Join code, required for private rooms unless already a viewer.
    #[serde(default)]
    pub code: Option<String>,
}

/// Arguments of `SendMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageArgs {
    /// Raw message text.
    pub text: String,
}

/// Arguments of `SetPause`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPauseArgs {
    /// Whether playback should be paused.
    pub pause: bool,
    /// Position at which the change happened.
    pub position_ticks: i64,
}

/// Arguments of `SetTimeLine`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTimeLineArgs {
    /// New position.
    pub position_ticks: i64,
}

/// Arguments of `SetEpisode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetEpisodeArgs {
    /// Season to select.
    pub season: i32,
    /// Episode to select.
    pub episode: i32,
}

/// Arguments of `SetSpeed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSpeedArgs {
    /// New playback rate.
    pub speed: f32,
}

/// Arguments of `SetFullscreen`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFullscreenArgs {
    /// New fullscreen flag.
    pub fullscreen: bool,
}

/// Arguments of commands aimed at another viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetArgs {
    /// The targeted user.
    pub target_id: Uuid,
}

/// Every method a client may invoke over its duplex channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// Join a room.
    Connect(ConnectArgs),
    /// Leave the joined room.
    Leave,
    /// Post a chat message.
    SendMessage(SendMessageArgs),
    /// Pause or resume playback.
    SetPause(SetPauseArgs),
    /// Seek.
    SetTimeLine(SetTimeLineArgs),
    /// Switch episode.
    SetEpisode(SetEpisodeArgs),
    /// Change playback rate.
    SetSpeed(SetSpeedArgs),
    /// Toggle fullscreen.
    SetFullscreen(SetFullscreenArgs),
    /// Nudge a viewer.
    Beep(TargetArgs),
    /// Scream at a viewer.
    Scream(TargetArgs),
    /// Remove and ban a viewer (owner only).
    Kick(TargetArgs),
    /// Request a full state snapshot.
    Sync,
}

impl ClientCommand {
    /// The envelope key for this command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect(_) => names::CONNECT,
            Self::Leave => names::LEAVE,
            Self::SendMessage(_) => names::SEND_MESSAGE,
            Self::SetPause(_) => names::SET_PAUSE,
            Self::SetTimeLine(_) => names::SET_TIME_LINE,
            Self::SetEpisode(_) => names::SET_EPISODE,
            Self::SetSpeed(_) => names::SET_SPEED,
            Self::SetFullscreen(_) => names::SET_FULLSCREEN,
            Self::Beep(_) => names::BEEP,
            Self::Scream(_) => names::SCREAM,
            Self::Kick(_) => names::KICK,
            Self::Sync => names::SYNC,
        }
    }
}
