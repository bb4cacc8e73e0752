//! Delivery addressing and the transport contract.

use uuid::Uuid;

use crate::events::NotificationEvent;

/// Identifies one live duplex connection.
pub type ConnectionId = Uuid;

/// Who receives a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every connection joined to the room's group.
    Broadcast {
        /// The room group.
        room_id: Uuid,
    },
    /// Every connection in the room's group except the one that issued the
    /// triggering command.
    BroadcastExceptSender {
        /// The room group.
        room_id: Uuid,
        /// The originating connection.
        sender: ConnectionId,
    },
    /// Only the connections in the room's group that belong to one user.
    Targeted {
        /// The room group.
        room_id: Uuid,
        /// The recipient.
        user_id: Uuid,
    },
    /// A single connection, whether or not it joined a group.
    Connection(ConnectionId),
}

/// Fire-and-forget delivery of notifications to live connections, grouped
/// by room.
///
/// Implementations must not block: `deliver` enqueues and returns. Failing
/// to reach an individual connection is logged and dropped, never reported
/// back to the caller.
pub trait RoomTransport: Send + Sync {
    /// Add a connection to the room's group.
    fn join_group(&self, room_id: Uuid, user_id: Uuid, connection_id: ConnectionId);

    /// Remove a connection from the room's group.
    fn leave_group(&self, room_id: Uuid, connection_id: ConnectionId);

    /// Remove every connection of `user_id` from the room's group.
    fn remove_user(&self, room_id: Uuid, user_id: Uuid);

    /// Drop the room's group entirely.
    fn dissolve_group(&self, room_id: Uuid);

    /// Enqueue `event` for every connection in `audience`.
    fn deliver(&self, audience: &Audience, event: &NotificationEvent);
}
