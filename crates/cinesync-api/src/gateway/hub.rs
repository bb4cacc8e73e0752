//! The connection hub: live WebSocket connections grouped by room.
//!
//! Each connection owns an unbounded outbound queue drained by its socket
//! task, so delivering never waits on a slow client. Frames are encoded once
//! per delivery and cloned into every recipient's queue.

use std::collections::HashSet;

use cinesync_protocol::codec::encode_event;
use cinesync_protocol::delivery::{Audience, ConnectionId, RoomTransport};
use cinesync_protocol::events::NotificationEvent;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug)]
struct Connection {
    user_id: Uuid,
    room_id: Option<Uuid>,
    // Set when the connection's group was dissolved under it.
    closed_room: Option<Uuid>,
    outbound: mpsc::UnboundedSender<String>,
}

/// Registry of live connections and the room groups they joined.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    connections: DashMap<ConnectionId, Connection>,
    groups: DashMap<Uuid, HashSet<ConnectionId>>,
}

impl ConnectionHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection for `user_id` and returns the receiving
    /// end of its outbound queue.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        user_id: Uuid,
    ) -> mpsc::UnboundedReceiver<String> {
        let (outbound, receiver) = mpsc::unbounded_channel();
        self.connections.insert(
            connection_id,
            Connection {
                user_id,
                room_id: None,
                closed_room: None,
                outbound,
            },
        );
        debug!(connection_id = %connection_id, user_id = %user_id, "connection registered");
        receiver
    }

    /// Forgets a connection and removes it from its group.
    pub fn unregister(&self, connection_id: ConnectionId) {
        let Some((_, connection)) = self.connections.remove(&connection_id) else {
            return;
        };
        if let Some(room_id) = connection.room_id {
            self.remove_from_group(room_id, connection_id);
        }
        debug!(connection_id = %connection_id, "connection unregistered");
    }

    /// The room whose group the connection currently belongs to.
    #[must_use]
    pub fn room_of(&self, connection_id: ConnectionId) -> Option<Uuid> {
        self.connections
            .get(&connection_id)
            .and_then(|c| c.room_id)
    }

    /// The room that was closed while this connection was in it, until the
    /// connection joins another room.
    #[must_use]
    pub fn closed_room_of(&self, connection_id: ConnectionId) -> Option<Uuid> {
        self.connections
            .get(&connection_id)
            .and_then(|c| c.closed_room)
    }

    /// Number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections in the room's group.
    #[must_use]
    pub fn group_members(&self, room_id: Uuid) -> HashSet<ConnectionId> {
        self.groups
            .get(&room_id)
            .map(|g| g.value().clone())
            .unwrap_or_default()
    }

    fn remove_from_group(&self, room_id: Uuid, connection_id: ConnectionId) {
        let emptied = match self.groups.get_mut(&room_id) {
            Some(mut group) => {
                group.remove(&connection_id);
                group.is_empty()
            }
            None => false,
        };
        if emptied {
            self.groups.remove_if(&room_id, |_, g| g.is_empty());
        }
    }

    fn clear_room(&self, connection_id: ConnectionId, room_id: Uuid) {
        if let Some(mut connection) = self.connections.get_mut(&connection_id)
            && connection.room_id == Some(room_id)
        {
            connection.room_id = None;
        }
    }

    fn user_of(&self, connection_id: ConnectionId) -> Option<Uuid> {
        self.connections.get(&connection_id).map(|c| c.user_id)
    }

    fn recipients(&self, audience: &Audience) -> Vec<ConnectionId> {
        match *audience {
            Audience::Broadcast { room_id } => self.group_members(room_id).into_iter().collect(),
            Audience::BroadcastExceptSender { room_id, sender } => self
                .group_members(room_id)
                .into_iter()
                .filter(|id| *id != sender)
                .collect(),
            Audience::Targeted { room_id, user_id } => self
                .group_members(room_id)
                .into_iter()
                .filter(|id| self.user_of(*id) == Some(user_id))
                .collect(),
            Audience::Connection(connection_id) => vec![connection_id],
        }
    }
}

impl RoomTransport for ConnectionHub {
    fn join_group(&self, room_id: Uuid, user_id: Uuid, connection_id: ConnectionId) {
        let previous = match self.connections.get_mut(&connection_id) {
            Some(mut connection) => {
                connection.closed_room = None;
                connection.room_id.replace(room_id)
            }
            None => {
                debug!(connection_id = %connection_id, "join for a closed connection ignored");
                return;
            }
        };
        if let Some(previous) = previous.filter(|p| *p != room_id) {
            self.remove_from_group(previous, connection_id);
        }
        self.groups.entry(room_id).or_default().insert(connection_id);
        debug!(room_id = %room_id, user_id = %user_id, connection_id = %connection_id, "joined group");
    }

    fn leave_group(&self, room_id: Uuid, connection_id: ConnectionId) {
        self.remove_from_group(room_id, connection_id);
        self.clear_room(connection_id, room_id);
    }

    fn remove_user(&self, room_id: Uuid, user_id: Uuid) {
        let members: Vec<ConnectionId> = self
            .group_members(room_id)
            .into_iter()
            .filter(|id| self.user_of(*id) == Some(user_id))
            .collect();
        for connection_id in members {
            self.leave_group(room_id, connection_id);
        }
    }

    fn dissolve_group(&self, room_id: Uuid) {
        let Some((_, members)) = self.groups.remove(&room_id) else {
            return;
        };
        for connection_id in members {
            if let Some(mut connection) = self.connections.get_mut(&connection_id)
                && connection.room_id == Some(room_id)
            {
                connection.room_id = None;
                connection.closed_room = Some(room_id);
            }
        }
        debug!(room_id = %room_id, "group dissolved");
    }

    fn deliver(&self, audience: &Audience, event: &NotificationEvent) {
        let recipients = self.recipients(audience);
        if recipients.is_empty() {
            return;
        }
        let frame = match encode_event(event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(kind = event.kind(), error = %e, "failed to encode notification");
                return;
            }
        };
        for connection_id in recipients {
            let sent = self
                .connections
                .get(&connection_id)
                .is_some_and(|c| c.outbound.send(frame.clone()).is_ok());
            if !sent {
                debug!(connection_id = %connection_id, kind = event.kind(), "notification dropped");
            }
        }
    }
}
