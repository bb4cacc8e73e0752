//! Recording transport double.

use std::sync::Mutex;

use cinesync_protocol::delivery::{Audience, ConnectionId, RoomTransport};
use cinesync_protocol::events::NotificationEvent;
use uuid::Uuid;

/// One call made on a [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    /// `join_group`.
    JoinGroup {
        /// Room group.
        room_id: Uuid,
        /// Joining user.
        user_id: Uuid,
        /// Joining connection.
        connection_id: ConnectionId,
    },
    /// `leave_group`.
    LeaveGroup {
        /// Room group.
        room_id: Uuid,
        /// Leaving connection.
        connection_id: ConnectionId,
    },
    /// `remove_user`.
    RemoveUser {
        /// Room group.
        room_id: Uuid,
        /// Removed user.
        user_id: Uuid,
    },
    /// `dissolve_group`.
    DissolveGroup(Uuid),
    /// `deliver`.
    Deliver(Audience, NotificationEvent),
}

/// A transport that records every call in order and delivers nothing.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<TransportCall>>,
}

impl RecordingTransport {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Only the deliveries, in order.
    #[must_use]
    pub fn deliveries(&self) -> Vec<(Audience, NotificationEvent)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Deliver(audience, event) => Some((audience, event)),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RoomTransport for RecordingTransport {
    fn join_group(&self, room_id: Uuid, user_id: Uuid, connection_id: ConnectionId) {
        self.record(TransportCall::JoinGroup {
            room_id,
            user_id,
            connection_id,
        });
    }

    fn leave_group(&self, room_id: Uuid, connection_id: ConnectionId) {
        self.record(TransportCall::LeaveGroup {
            room_id,
            connection_id,
        });
    }

    fn remove_user(&self, room_id: Uuid, user_id: Uuid) {
        self.record(TransportCall::RemoveUser { room_id, user_id });
    }

    fn dissolve_group(&self, room_id: Uuid) {
        self.record(TransportCall::DissolveGroup(room_id));
    }

    fn deliver(&self, audience: &Audience, event: &NotificationEvent) {
        self.record(TransportCall::Deliver(*audience, event.clone()));
    }
}
