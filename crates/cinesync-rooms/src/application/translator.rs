//! Maps room domain events to wire notifications and their audiences, and
//! hands them to the transport.

use cinesync_protocol::delivery::{Audience, ConnectionId, RoomTransport};
use cinesync_protocol::events::{
    BeepNotification, DeleteNotification, EpisodeNotification, FullscreenNotification,
    JoinNotification, KickNotification, LeaveNotification, MessageNotification,
    NotificationEvent, PauseNotification, PresenceNotification, ScreamNotification,
    SpeedNotification, TimeLineNotification,
};
use tracing::debug;

use crate::domain::events::{RoomEvent, RoomEventKind};

/// One notification bound for one audience.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Who receives it.
    pub audience: Audience,
    /// What they receive.
    pub event: NotificationEvent,
}

/// Translates a domain event raised by a command that arrived on `origin`.
///
/// Returns `None` for events that have no wire counterpart.
#[must_use]
pub fn translate(event: &RoomEvent, origin: ConnectionId) -> Option<Delivery> {
    let room_id = event.metadata.aggregate_id;
    let broadcast = Audience::Broadcast { room_id };
    let except_sender = Audience::BroadcastExceptSender {
        room_id,
        sender: origin,
    };

    let (audience, notification) = match &event.kind {
        RoomEventKind::RoomCreated(_) => return None,
        RoomEventKind::ViewerJoined(e) => (
            except_sender,
            NotificationEvent::Join(JoinNotification {
                initiator: e.user_id,
                name: e.name.clone(),
                photo_ref: e.photo_ref.clone(),
            }),
        ),
        RoomEventKind::ViewerReconnected(e) => (
            except_sender,
            NotificationEvent::Presence(PresenceNotification {
                initiator: e.user_id,
                online: true,
            }),
        ),
        RoomEventKind::ViewerDisconnected(e) => (
            broadcast,
            NotificationEvent::Presence(PresenceNotification {
                initiator: e.user_id,
                online: false,
            }),
        ),
        RoomEventKind::ViewerLeft(e) => (
            except_sender,
            NotificationEvent::Leave(LeaveNotification {
                initiator: e.user_id,
            }),
        ),
        RoomEventKind::ViewerKicked(e) => (
            broadcast,
            NotificationEvent::Kick(KickNotification {
                initiator: e.initiator_id,
                target: e.target_id,
            }),
        ),
        RoomEventKind::MessageSent(e) => (
            broadcast,
            NotificationEvent::Message(MessageNotification {
                initiator: e.user_id,
                message_id: e.message_id,
                text: e.text.clone(),
                sent_at: e.sent_at,
            }),
        ),
        RoomEventKind::PauseChanged(e) => (
            except_sender,
            NotificationEvent::Pause(PauseNotification {
                initiator: e.initiator_id,
                paused: e.paused,
                position_ticks: e.position_ticks,
            }),
        ),
        RoomEventKind::TimeLineChanged(e) => (
            except_sender,
            NotificationEvent::TimeLine(TimeLineNotification {
                initiator: e.initiator_id,
                position_ticks: e.position_ticks,
            }),
        ),
        RoomEventKind::EpisodeChanged(e) => (
            except_sender,
            NotificationEvent::Episode(EpisodeNotification {
                initiator: e.initiator_id,
                season: e.season,
                episode: e.episode,
            }),
        ),
        RoomEventKind::SpeedChanged(e) => (
            except_sender,
            NotificationEvent::Speed(SpeedNotification {
                initiator: e.initiator_id,
                speed: e.speed,
            }),
        ),
        RoomEventKind::FullscreenChanged(e) => (
            except_sender,
            NotificationEvent::Fullscreen(FullscreenNotification {
                initiator: e.initiator_id,
                fullscreen: e.fullscreen,
            }),
        ),
        RoomEventKind::Beeped(e) => (
            Audience::Targeted {
                room_id,
                user_id: e.target_id,
            },
            NotificationEvent::Beep(BeepNotification {
                initiator: e.initiator_id,
                target: e.target_id,
            }),
        ),
        RoomEventKind::Screamed(e) => (
            Audience::Targeted {
                room_id,
                user_id: e.target_id,
            },
            NotificationEvent::Scream(ScreamNotification {
                initiator: e.initiator_id,
                target: e.target_id,
            }),
        ),
        RoomEventKind::RoomClosed(e) => (
            except_sender,
            NotificationEvent::Delete(DeleteNotification {
                initiator: e.owner_id,
                room_id,
            }),
        ),
    };

    Some(Delivery {
        audience,
        event: notification,
    })
}

/// Delivers `events` in the order they were recorded and applies the group
/// changes they imply: a kicked user's connections leave the group after the
/// kick is announced, and a closed room's group is dissolved.
pub fn publish(transport: &dyn RoomTransport, events: &[RoomEvent], origin: ConnectionId) {
    for event in events {
        if let Some(delivery) = translate(event, origin) {
            debug!(
                room_id = %event.metadata.aggregate_id,
                kind = delivery.event.kind(),
                sequence = event.metadata.sequence_number,
                "publishing notification"
            );
            transport.deliver(&delivery.audience, &delivery.event);
        }

        match &event.kind {
            RoomEventKind::ViewerKicked(e) => {
                transport.remove_user(event.metadata.aggregate_id, e.target_id);
            }
            RoomEventKind::RoomClosed(_) => {
                transport.dissolve_group(event.metadata.aggregate_id);
            }
            _ => {}
        }
    }
}
