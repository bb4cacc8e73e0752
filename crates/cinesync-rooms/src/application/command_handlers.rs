//! Command handlers for the room context.
//!
//! Each handler acquires the room's lease, loads the working copy, invokes
//! one aggregate operation, persists the result and publishes the recorded
//! events while still holding the lease. Publication order therefore follows
//! lease acquisition order across commands.

use std::fmt;
use std::sync::{Arc, Mutex};

use cinesync_core::aggregate::AggregateRoot;
use cinesync_core::clock::Clock;
use cinesync_core::collaborators::{MediaAvailability, UserLookup, UserProfile};
use cinesync_core::command::Command;
use cinesync_core::error::DomainError;
use cinesync_core::repository::StoredMessage;
use cinesync_core::rng::DeterministicRng;
use cinesync_protocol::delivery::{Audience, ConnectionId, RoomTransport};
use cinesync_protocol::events::{ErrorNotification, NotificationEvent, SyncNotification};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::query_handlers;
use super::room_store::{RoomLease, RoomStore};
use super::translator::publish;
use crate::domain::aggregates::{Room, RoomSettings, RoomState};
use crate::domain::commands::{
    BeepViewer, ConnectViewer, CreateRoom, DisconnectViewer, KickViewer, LeaveRoom,
    ScreamAtViewer, SendMessage, SetEpisode, SetFullscreen, SetPause, SetSpeed, SetTimeLine,
    SyncRoom,
};
use crate::domain::events::RoomEvent;

/// Length of generated join codes.
pub const ROOM_CODE_LENGTH: usize = 6;

/// Characters used for join codes; look-alikes (0/O, 1/I/L) are left out.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Default number of chat messages included in a room snapshot.
pub const DEFAULT_MESSAGE_HISTORY_LIMIT: usize = 50;

/// Error code sent to clients when a command fails for a systemic reason.
pub const DELIVERY_FAILURE_CODE: &str = "delivery_failure";

/// Everything the handlers need besides the command itself.
#[derive(Clone)]
pub struct RoomContext {
    /// Working copies and persistence.
    pub store: RoomStore,
    /// User directory.
    pub users: Arc<dyn UserLookup>,
    /// Media readiness.
    pub media: Arc<dyn MediaAvailability>,
    /// Outbound delivery.
    pub transport: Arc<dyn RoomTransport>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Randomness for join codes.
    pub rng: Arc<Mutex<dyn DeterministicRng>>,
    /// Settings stamped on new rooms.
    pub settings: RoomSettings,
    /// Messages included in sync snapshots.
    pub message_history_limit: usize,
}

impl fmt::Debug for RoomContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomContext")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("message_history_limit", &self.message_history_limit)
            .finish_non_exhaustive()
    }
}

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct RoomCommandResult {
    /// The room the command affected.
    pub room_id: Uuid,
    /// The events produced, persisted and published, in recorded order.
    pub events: Vec<RoomEvent>,
}

/// Result of a successful room creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRoom {
    /// The new room.
    pub room_id: Uuid,
    /// The join code, for private rooms.
    pub code: Option<String>,
}

async fn find_user(ctx: &RoomContext, user_id: Uuid) -> Result<UserProfile, DomainError> {
    ctx.users
        .find_user(user_id)
        .await?
        .ok_or(DomainError::UserNotFound(user_id))
}

async fn ensure_media_available(ctx: &RoomContext, media_id: Uuid) -> Result<(), DomainError> {
    if ctx.media.is_available(media_id).await? {
        Ok(())
    } else {
        Err(DomainError::MediaNotAvailable(media_id))
    }
}

fn generate_code(ctx: &RoomContext) -> Result<String, DomainError> {
    let mut rng = ctx
        .rng
        .lock()
        .map_err(|e| DomainError::Infrastructure(format!("rng lock poisoned: {e}")))?;
    let max_index = u32::try_from(ROOM_CODE_ALPHABET.len() - 1)
        .map_err(|e| DomainError::Infrastructure(e.to_string()))?;
    let code = (0..ROOM_CODE_LENGTH)
        .map(|_| {
            let index = rng.next_u32_range(0, max_index) as usize % ROOM_CODE_ALPHABET.len();
            char::from(ROOM_CODE_ALPHABET[index])
        })
        .collect();
    Ok(code)
}

/// Runs `mutate` against the leased room, commits the room (with any chat
/// message it returns) and publishes the events, holding the lease until
/// publication finishes.
async fn mutate_and_publish<F>(
    ctx: &RoomContext,
    room_id: Uuid,
    origin: ConnectionId,
    mutate: F,
) -> Result<RoomCommandResult, DomainError>
where
    F: FnOnce(&mut Room, &dyn Clock) -> Result<Option<StoredMessage>, DomainError>,
{
    let mut lease = ctx.store.acquire(room_id).await?;
    let room = lease.get_or_load().await?;
    if let Some(message) = mutate(room, ctx.clock.as_ref())? {
        lease.stage_message(message);
    }
    let (_lease, events) = lease.commit().await?;
    publish(ctx.transport.as_ref(), &events, origin);
    Ok(RoomCommandResult { room_id, events })
}

/// Handles the `CreateRoom` command: checks the owner and media, creates the
/// room and inserts it into the store.
///
/// # Errors
///
/// Returns `DomainError::UserNotFound` or `DomainError::MediaNotAvailable`
/// when a collaborator rejects the request, and repository errors.
#[instrument(skip_all, fields(owner_id = %command.owner_id, correlation_id = %command.correlation_id))]
pub async fn handle_create_room(
    command: &CreateRoom,
    ctx: &RoomContext,
) -> Result<CreatedRoom, DomainError> {
    let owner = find_user(ctx, command.owner_id).await?;
    ensure_media_available(ctx, command.media_id).await?;
    let code = if command.private {
        Some(generate_code(ctx)?)
    } else {
        None
    };

    let room_id = Uuid::new_v4();
    let room = Room::create(
        room_id,
        &owner,
        command.media_id,
        code.clone(),
        ctx.settings,
        command.correlation_id,
        ctx.clock.as_ref(),
    )?;
    let mut lease = ctx.store.acquire(room_id).await?;
    lease.install(room)?;
    lease.commit().await?;

    info!(room_id = %room_id, private = command.private, "room created");
    Ok(CreatedRoom { room_id, code })
}

/// Handles the `ConnectViewer` command: admits the user, adds the connection
/// to the room group, announces the join and sends the joiner a snapshot.
///
/// # Errors
///
/// Returns `DomainError::UserNotFound`, `DomainError::RoomNotFound`,
/// `DomainError::MediaNotAvailable`, or any error of [`Room::connect`].
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_connect(
    command: &ConnectViewer,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    let user = find_user(ctx, command.user_id).await?;

    let mut lease = ctx.store.acquire(command.room_id).await?;
    let media_id = lease.get_or_load().await?.media_id();
    ensure_media_available(ctx, media_id).await?;
    lease.get_or_load().await?.connect(
        &user,
        command.code.as_deref(),
        command.connection_id,
        command.correlation_id,
        ctx.clock.as_ref(),
    )?;
    let (lease, events) = lease.commit().await?;

    ctx.transport
        .join_group(command.room_id, command.user_id, command.connection_id);
    publish(ctx.transport.as_ref(), &events, command.connection_id);
    send_snapshot(ctx, &lease, command.user_id, command.connection_id).await;

    debug!(events = events.len(), "viewer connected");
    Ok(RoomCommandResult {
        room_id: command.room_id,
        events,
    })
}

/// Handles the `DisconnectViewer` command issued when a connection closes:
/// marks the viewer offline if that connection was its current one and
/// removes the connection from the group. The room survives, even when the
/// owner drops.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` if the room is gone, and repository
/// errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_disconnect(
    command: &DisconnectViewer,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    ctx.transport
        .leave_group(command.room_id, command.connection_id);

    let mut lease = ctx.store.acquire(command.room_id).await?;
    let changed = lease.get_or_load().await?.disconnect(
        command.user_id,
        command.connection_id,
        command.correlation_id,
        ctx.clock.as_ref(),
    )?;
    if !changed {
        return Ok(RoomCommandResult {
            room_id: command.room_id,
            events: Vec::new(),
        });
    }

    let (_lease, events) = lease.commit().await?;
    publish(ctx.transport.as_ref(), &events, command.connection_id);
    Ok(RoomCommandResult {
        room_id: command.room_id,
        events,
    })
}

/// Handles the `LeaveRoom` command. When the owner leaves, the room is
/// deleted and its group dissolved.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound`, `DomainError::ViewerNotFound`, and
/// repository errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_leave(
    command: &LeaveRoom,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    let mut lease = ctx.store.acquire(command.room_id).await?;
    let room = lease.get_or_load().await?;
    room.leave(command.user_id, command.correlation_id, ctx.clock.as_ref())?;
    let closing = room.state() == RoomState::PendingDelete;

    let (_lease, events) = if closing {
        lease.delete().await?
    } else {
        lease.commit().await?
    };

    ctx.transport.remove_user(command.room_id, command.user_id);
    publish(ctx.transport.as_ref(), &events, command.connection_id);
    if closing {
        info!("owner left, room deleted");
    }
    Ok(RoomCommandResult {
        room_id: command.room_id,
        events,
    })
}

/// Handles the `KickViewer` command.
///
/// # Errors
///
/// Returns any error of [`Room::kick`] and repository errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id, target_id = %command.target_id))]
pub async fn handle_kick(
    command: &KickViewer,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    mutate_and_publish(ctx, command.room_id, command.connection_id, |room, clock| {
        room.kick(
            command.user_id,
            command.target_id,
            command.correlation_id,
            clock,
        )?;
        Ok(None)
    })
    .await
}

/// Handles the `SendMessage` command; the message is persisted with the
/// room.
///
/// # Errors
///
/// Returns any error of [`Room::send_message`] and repository errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id))]
pub async fn handle_send_message(
    command: &SendMessage,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    mutate_and_publish(ctx, command.room_id, command.connection_id, |room, clock| {
        let message =
            room.send_message(command.user_id, &command.text, command.correlation_id, clock)?;
        Ok(Some(message.to_stored()))
    })
    .await
}

/// Handles the `SetPause` command.
///
/// # Errors
///
/// Returns any error of [`Room::set_pause`] and repository errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id))]
pub async fn handle_set_pause(
    command: &SetPause,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    mutate_and_publish(ctx, command.room_id, command.connection_id, |room, clock| {
        room.set_pause(
            command.user_id,
            command.paused,
            command.position_ticks,
            command.correlation_id,
            clock,
        )?;
        Ok(None)
    })
    .await
}

/// Handles the `SetTimeLine` command.
///
/// # Errors
///
/// Returns any error of [`Room::set_time_line`] and repository errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id))]
pub async fn handle_set_time_line(
    command: &SetTimeLine,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    mutate_and_publish(ctx, command.room_id, command.connection_id, |room, clock| {
        room.set_time_line(
            command.user_id,
            command.position_ticks,
            command.correlation_id,
            clock,
        )?;
        Ok(None)
    })
    .await
}

/// Handles the `SetEpisode` command.
///
/// # Errors
///
/// Returns any error of [`Room::set_episode`] and repository errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id))]
pub async fn handle_set_episode(
    command: &SetEpisode,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    mutate_and_publish(ctx, command.room_id, command.connection_id, |room, clock| {
        room.set_episode(
            command.user_id,
            command.season,
            command.episode,
            command.correlation_id,
            clock,
        )?;
        Ok(None)
    })
    .await
}

/// Handles the `SetSpeed` command.
///
/// # Errors
///
/// Returns any error of [`Room::set_speed`] and repository errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id))]
pub async fn handle_set_speed(
    command: &SetSpeed,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    mutate_and_publish(ctx, command.room_id, command.connection_id, |room, clock| {
        room.set_speed(command.user_id, command.speed, command.correlation_id, clock)?;
        Ok(None)
    })
    .await
}

/// Handles the `SetFullscreen` command.
///
/// # Errors
///
/// Returns any error of [`Room::set_fullscreen`] and repository errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id))]
pub async fn handle_set_fullscreen(
    command: &SetFullscreen,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    mutate_and_publish(ctx, command.room_id, command.connection_id, |room, clock| {
        room.set_fullscreen(
            command.user_id,
            command.fullscreen,
            command.correlation_id,
            clock,
        )?;
        Ok(None)
    })
    .await
}

/// Handles the `BeepViewer` command.
///
/// # Errors
///
/// Returns any error of [`Room::beep`] and repository errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id, target_id = %command.target_id))]
pub async fn handle_beep(
    command: &BeepViewer,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    mutate_and_publish(ctx, command.room_id, command.connection_id, |room, clock| {
        room.beep(
            command.user_id,
            command.target_id,
            command.correlation_id,
            clock,
        )?;
        Ok(None)
    })
    .await
}

/// Handles the `ScreamAtViewer` command.
///
/// # Errors
///
/// Returns any error of [`Room::scream`] and repository errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id, target_id = %command.target_id))]
pub async fn handle_scream(
    command: &ScreamAtViewer,
    ctx: &RoomContext,
) -> Result<RoomCommandResult, DomainError> {
    mutate_and_publish(ctx, command.room_id, command.connection_id, |room, clock| {
        room.scream(
            command.user_id,
            command.target_id,
            command.correlation_id,
            clock,
        )?;
        Ok(None)
    })
    .await
}

/// Handles the `SyncRoom` command: sends the requesting connection a full
/// snapshot of the room.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound`, `DomainError::ViewerNotFound` for
/// non-viewers, and repository errors.
#[instrument(skip_all, fields(room_id = %command.room_id, user_id = %command.user_id))]
pub async fn handle_sync(command: &SyncRoom, ctx: &RoomContext) -> Result<(), DomainError> {
    let mut lease = ctx.store.acquire(command.room_id).await?;
    if !lease.get_or_load().await?.is_viewer(command.user_id) {
        return Err(DomainError::ViewerNotFound(command.user_id));
    }
    let notification = sync_notification(ctx, &lease, command.user_id).await?;
    ctx.transport
        .deliver(&Audience::Connection(command.connection_id), &notification);
    Ok(())
}

async fn sync_notification(
    ctx: &RoomContext,
    lease: &RoomLease,
    user_id: Uuid,
) -> Result<NotificationEvent, DomainError> {
    let Some(room) = lease.room() else {
        return Err(DomainError::RoomNotFound(lease.room_id()));
    };
    let messages = ctx
        .store
        .recent_messages(room.id, ctx.message_history_limit)
        .await?;
    Ok(NotificationEvent::Sync(SyncNotification {
        initiator: user_id,
        state: query_handlers::room_state(&room.to_snapshot(room.version()), messages),
    }))
}

async fn send_snapshot(
    ctx: &RoomContext,
    lease: &RoomLease,
    user_id: Uuid,
    connection_id: ConnectionId,
) {
    match sync_notification(ctx, lease, user_id).await {
        Ok(notification) => ctx
            .transport
            .deliver(&Audience::Connection(connection_id), &notification),
        Err(e) => warn!(room_id = %lease.room_id(), error = %e, "could not build join snapshot"),
    }
}

/// Builds the notification reporting `error` to the user who issued
/// `command`. User-facing failures keep their code and message; systemic ones
/// are reported as a generic delivery failure.
#[must_use]
pub fn error_notification(command: &dyn Command, error: &DomainError) -> NotificationEvent {
    let (code, message) = if error.is_user_facing() {
        (error.code().to_owned(), error.to_string())
    } else {
        (
            DELIVERY_FAILURE_CODE.to_owned(),
            "the request could not be completed, please retry".to_owned(),
        )
    };
    NotificationEvent::Error(ErrorNotification {
        initiator: command.initiator(),
        code,
        message,
    })
}

/// Reports a failed command to the originating connection only. Other
/// viewers see nothing.
pub fn report_failure(
    transport: &dyn RoomTransport,
    command: &dyn Command,
    connection_id: ConnectionId,
    error: &DomainError,
) {
    if error.is_user_facing() {
        debug!(
            command = command.command_type(),
            correlation_id = %command.correlation_id(),
            code = error.code(),
            "command rejected"
        );
    } else {
        error!(
            command = command.command_type(),
            correlation_id = %command.correlation_id(),
            error = %error,
            "command failed"
        );
    }
    transport.deliver(
        &Audience::Connection(connection_id),
        &error_notification(command, error),
    );
}
