//! Commands for the room context.
//!
//! Every command issued over the duplex channel carries the originating
//! connection so failures can be reported back to it alone.

use cinesync_core::command::Command;
use uuid::Uuid;

/// Command to create a new room.
#[derive(Debug, Clone)]
pub struct CreateRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The creating user, who becomes the owner.
    pub owner_id: Uuid,
    /// The media to watch.
    pub media_id: Uuid,
    /// Whether the room requires a join code.
    pub private: bool,
}

impl Command for CreateRoom {
    fn command_type(&self) -> &'static str {
        "room.create"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.owner_id
    }
}

/// Command to join (or rejoin) a room on a connection.
#[derive(Debug, Clone)]
pub struct ConnectViewer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
    /// The join code, required for newcomers to private rooms.
    pub code: Option<String>,
}

impl Command for ConnectViewer {
    fn command_type(&self) -> &'static str {
        "room.connect_viewer"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command issued by the transport when a connection closes without leaving.
#[derive(Debug, Clone)]
pub struct DisconnectViewer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
}

impl Command for DisconnectViewer {
    fn command_type(&self) -> &'static str {
        "room.disconnect_viewer"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command to leave a room.
#[derive(Debug, Clone)]
pub struct LeaveRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
}

impl Command for LeaveRoom {
    fn command_type(&self) -> &'static str {
        "room.leave"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command to kick and ban a viewer.
#[derive(Debug, Clone)]
pub struct KickViewer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
    /// The viewer to remove.
    pub target_id: Uuid,
}

impl Command for KickViewer {
    fn command_type(&self) -> &'static str {
        "room.kick_viewer"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command to post a chat message.
#[derive(Debug, Clone)]
pub struct SendMessage {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
    /// Raw message text.
    pub text: String,
}

impl Command for SendMessage {
    fn command_type(&self) -> &'static str {
        "room.send_message"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command to pause or resume playback.
#[derive(Debug, Clone)]
pub struct SetPause {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
    /// Whether playback is paused.
    pub paused: bool,
    /// Position at which the change happened.
    pub position_ticks: i64,
}

impl Command for SetPause {
    fn command_type(&self) -> &'static str {
        "room.set_pause"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command to seek.
#[derive(Debug, Clone)]
pub struct SetTimeLine {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
    /// New position.
    pub position_ticks: i64,
}

impl Command for SetTimeLine {
    fn command_type(&self) -> &'static str {
        "room.set_time_line"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command to switch episode.
#[derive(Debug, Clone)]
pub struct SetEpisode {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
    /// Season number.
    pub season: i32,
    /// Episode number.
    pub episode: i32,
}

impl Command for SetEpisode {
    fn command_type(&self) -> &'static str {
        "room.set_episode"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command to change the playback rate.
#[derive(Debug, Clone)]
pub struct SetSpeed {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
    /// New playback rate.
    pub speed: f32,
}

impl Command for SetSpeed {
    fn command_type(&self) -> &'static str {
        "room.set_speed"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command to toggle fullscreen.
#[derive(Debug, Clone)]
pub struct SetFullscreen {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
    /// New fullscreen flag.
    pub fullscreen: bool,
}

impl Command for SetFullscreen {
    fn command_type(&self) -> &'static str {
        "room.set_fullscreen"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command to beep another viewer.
#[derive(Debug, Clone)]
pub struct BeepViewer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
    /// The viewer to beep.
    pub target_id: Uuid,
}

impl Command for BeepViewer {
    fn command_type(&self) -> &'static str {
        "room.beep"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command to scream at another viewer.
#[derive(Debug, Clone)]
pub struct ScreamAtViewer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
    /// The viewer to scream at.
    pub target_id: Uuid,
}

impl Command for ScreamAtViewer {
    fn command_type(&self) -> &'static str {
        "room.scream"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}

/// Command requesting a full state snapshot.
#[derive(Debug, Clone)]
pub struct SyncRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room the command targets.
    pub room_id: Uuid,
    /// The issuing user.
    pub user_id: Uuid,
    /// The issuing connection.
    pub connection_id: Uuid,
}

impl Command for SyncRoom {
    fn command_type(&self) -> &'static str {
        "room.sync"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn initiator(&self) -> Uuid {
        self.user_id
    }
}
