//! Per-connection command dispatch.
//!
//! A [`Session`] turns decoded client frames into room commands and runs
//! them through the handlers. Failures are reported to the originating
//! connection only; the socket stays open.

use std::future::Future;

use cinesync_core::command::Command;
use cinesync_core::error::DomainError;
use cinesync_protocol::codec::decode_command;
use cinesync_protocol::commands::{ClientCommand, ConnectArgs};
use cinesync_protocol::delivery::{Audience, ConnectionId};
use cinesync_protocol::events::{ErrorNotification, NotificationEvent};
use cinesync_rooms::application::command_handlers::{
    RoomContext, handle_beep, handle_connect, handle_disconnect, handle_kick, handle_leave,
    handle_scream, handle_send_message, handle_set_episode, handle_set_fullscreen,
    handle_set_pause, handle_set_speed, handle_set_time_line, handle_sync, report_failure,
};
use cinesync_rooms::domain::commands::{
    BeepViewer, ConnectViewer, DisconnectViewer, KickViewer, LeaveRoom, ScreamAtViewer,
    SendMessage, SetEpisode, SetFullscreen, SetPause, SetSpeed, SetTimeLine, SyncRoom,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Error code sent back for frames that cannot be decoded.
pub const INVALID_MESSAGE_CODE: &str = "invalid_message";

/// One authenticated duplex connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// The user behind the connection.
    pub user_id: Uuid,
    /// The connection's identifier in the hub.
    pub connection_id: ConnectionId,
}

impl Session {
    /// Creates a session for `user_id` on `connection_id`.
    #[must_use]
    pub fn new(user_id: Uuid, connection_id: ConnectionId) -> Self {
        Self {
            user_id,
            connection_id,
        }
    }

    /// Decodes and dispatches one text frame.
    pub async fn handle_frame(&self, state: &AppState, raw: &str) {
        match decode_command(raw) {
            Ok(command) => self.dispatch(state, command).await,
            Err(e) => {
                debug!(connection_id = %self.connection_id, error = %e, "undecodable frame");
                self.reject(state, INVALID_MESSAGE_CODE, e.to_string());
            }
        }
    }

    /// Reports a frame the gateway refuses to decode.
    pub fn reject(&self, state: &AppState, code: &str, message: String) {
        state.rooms.transport.deliver(
            &Audience::Connection(self.connection_id),
            &NotificationEvent::Error(ErrorNotification {
                initiator: self.user_id,
                code: code.to_owned(),
                message,
            }),
        );
    }

    /// Runs a decoded command. Every command but `Connect` applies to the
    /// room this connection joined; after that room closes they fail with
    /// `RoomNotFound`.
    pub async fn dispatch(&self, state: &AppState, command: ClientCommand) {
        let correlation_id = Uuid::new_v4();
        let ctx = &state.rooms;

        match command {
            ClientCommand::Connect(args) => self.connect(state, args, correlation_id).await,
            command => {
                let Some(room_id) = state.hub.room_of(self.connection_id) else {
                    let error = match state.hub.closed_room_of(self.connection_id) {
                        Some(closed) => DomainError::RoomNotFound(closed),
                        None => DomainError::ViewerNotFound(self.user_id),
                    };
                    debug!(command = command.name(), code = error.code(), "command outside a room");
                    self.reject(state, error.code(), error.to_string());
                    return;
                };
                self.dispatch_in_room(ctx, room_id, command, correlation_id)
                    .await;
            }
        }
    }

    async fn connect(&self, state: &AppState, args: ConnectArgs, correlation_id: Uuid) {
        let command = ConnectViewer {
            correlation_id,
            room_id: args.room_id,
            user_id: self.user_id,
            connection_id: self.connection_id,
            code: args.code,
        };
        if state.hub.room_of(self.connection_id).is_some() {
            report_failure(
                state.rooms.transport.as_ref(),
                &command,
                self.connection_id,
                &DomainError::UserAlreadyInRoom(self.user_id),
            );
            return;
        }
        self.run(&state.rooms, &command, handle_connect).await;
    }

    async fn dispatch_in_room(
        &self,
        ctx: &RoomContext,
        room_id: Uuid,
        command: ClientCommand,
        correlation_id: Uuid,
    ) {
        let user_id = self.user_id;
        let connection_id = self.connection_id;

        match command {
            // Handled before a room is resolved.
            ClientCommand::Connect(_) => {}
            ClientCommand::Leave => {
                let command = LeaveRoom {
                    correlation_id,
                    room_id,
                    user_id,
                    connection_id,
                };
                self.run(ctx, &command, handle_leave).await;
            }
            ClientCommand::SendMessage(args) => {
                let command = SendMessage {
                    correlation_id,
                    room_id,
                    user_id,
                    connection_id,
                    text: args.text,
                };
                self.run(ctx, &command, handle_send_message).await;
            }
            ClientCommand::SetPause(args) => {
                let command = SetPause {
                    correlation_id,
                    room_id,
                    user_id,
                    connection_id,
                    paused: args.pause,
                    position_ticks: args.position_ticks,
                };
                self.run(ctx, &command, handle_set_pause).await;
            }
            ClientCommand::SetTimeLine(args) => {
                let command = SetTimeLine {
                    correlation_id,
                    room_id,
                    user_id,
                    connection_id,
                    position_ticks: args.position_ticks,
                };
                self.run(ctx, &command, handle_set_time_line).await;
            }
            ClientCommand::SetEpisode(args) => {
                let command = SetEpisode {
                    correlation_id,
                    room_id,
                    user_id,
                    connection_id,
                    season: args.season,
                    episode: args.episode,
                };
                self.run(ctx, &command, handle_set_episode).await;
            }
            ClientCommand::SetSpeed(args) => {
                let command = SetSpeed {
                    correlation_id,
                    room_id,
                    user_id,
                    connection_id,
                    speed: args.speed,
                };
                self.run(ctx, &command, handle_set_speed).await;
            }
            ClientCommand::SetFullscreen(args) => {
                let command = SetFullscreen {
                    correlation_id,
                    room_id,
                    user_id,
                    connection_id,
                    fullscreen: args.fullscreen,
                };
                self.run(ctx, &command, handle_set_fullscreen).await;
            }
            ClientCommand::Beep(args) => {
                let command = BeepViewer {
                    correlation_id,
                    room_id,
                    user_id,
                    connection_id,
                    target_id: args.target_id,
                };
                self.run(ctx, &command, handle_beep).await;
            }
            ClientCommand::Scream(args) => {
                let command = ScreamAtViewer {
                    correlation_id,
                    room_id,
                    user_id,
                    connection_id,
                    target_id: args.target_id,
                };
                self.run(ctx, &command, handle_scream).await;
            }
            ClientCommand::Kick(args) => {
                let command = KickViewer {
                    correlation_id,
                    room_id,
                    user_id,
                    connection_id,
                    target_id: args.target_id,
                };
                self.run(ctx, &command, handle_kick).await;
            }
            ClientCommand::Sync => {
                let command = SyncRoom {
                    correlation_id,
                    room_id,
                    user_id,
                    connection_id,
                };
                self.run(ctx, &command, handle_sync).await;
            }
        }
    }

    async fn run<'a, C, T, F, Fut>(&self, ctx: &'a RoomContext, command: &'a C, handler: F)
    where
        C: Command,
        F: FnOnce(&'a C, &'a RoomContext) -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        if let Err(e) = handler(command, ctx).await {
            report_failure(ctx.transport.as_ref(), command, self.connection_id, &e);
        }
    }

    /// Runs disconnect handling for a closed socket and forgets the
    /// connection.
    pub async fn close(&self, state: &AppState) {
        if let Some(room_id) = state.hub.room_of(self.connection_id) {
            let command = DisconnectViewer {
                correlation_id: Uuid::new_v4(),
                room_id,
                user_id: self.user_id,
                connection_id: self.connection_id,
            };
            if let Err(e) = handle_disconnect(&command, &state.rooms).await {
                warn!(room_id = %room_id, user_id = %self.user_id, error = %e, "disconnect handling failed");
            }
        }
        state.hub.unregister(self.connection_id);
    }
}
