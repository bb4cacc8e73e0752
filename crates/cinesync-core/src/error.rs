//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// The closed set of failures a room command can end in.
///
/// The first group is user-attributable: the initiating client caused it and
/// gets it back as a targeted error notification. The remaining variants are
/// systemic and never reach other viewers.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The user is unknown to the user directory.
    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    /// The room does not exist, was deleted, or is pending deletion.
    #[error("room not found: {0}")]
    RoomNotFound(Uuid),

    /// The room requires a code and the supplied one does not match.
    #[error("invalid room code")]
    InvalidCode,

    /// The room already holds as many viewers as its capacity allows.
    #[error("room {room_id} is full (capacity {capacity})")]
    RoomIsFull {
        /// The room that rejected the viewer.
        room_id: Uuid,
        /// The room's capacity.
        capacity: usize,
    },

    /// The connection is already joined to a room.
    #[error("user {0} is already in a room on this connection")]
    UserAlreadyInRoom(Uuid),

    /// The user was banned from the room.
    #[error("user {0} is banned in this room")]
    UserBannedInRoom(Uuid),

    /// The initiator lacks the authority for the action.
    #[error("action not allowed: {0}")]
    ActionNotAllowed(String),

    /// The underlying media is not ready for playback.
    #[error("media not available: {0}")]
    MediaNotAvailable(Uuid),

    /// The referenced user is not a viewer of the room.
    #[error("viewer not found: {0}")]
    ViewerNotFound(Uuid),

    /// Input failed domain validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The durable copy moved on since this working copy was loaded.
    #[error("concurrency conflict on room {room_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The room that had the conflict.
        room_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// The per-room exclusion could not be acquired in time.
    #[error("room {0} is busy, try again")]
    RoomBusy(Uuid),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Stable machine-readable code used on the wire and in HTTP bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "user_not_found",
            Self::RoomNotFound(_) => "room_not_found",
            Self::InvalidCode => "invalid_code",
            Self::RoomIsFull { .. } => "room_is_full",
            Self::UserAlreadyInRoom(_) => "user_already_in_room",
            Self::UserBannedInRoom(_) => "user_banned_in_room",
            Self::ActionNotAllowed(_) => "action_not_allowed",
            Self::MediaNotAvailable(_) => "media_not_available",
            Self::ViewerNotFound(_) => "viewer_not_found",
            Self::Validation(_) => "validation_error",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::RoomBusy(_) => "room_busy",
            Self::Infrastructure(_) => "infrastructure_error",
        }
    }

    /// Whether the initiating user caused this failure.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::RoomBusy(_) | Self::Infrastructure(_)
        )
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_errors_are_user_facing() {
        let id = Uuid::new_v4();
        let errors = [
            DomainError::UserNotFound(id),
            DomainError::RoomNotFound(id),
            DomainError::InvalidCode,
            DomainError::RoomIsFull {
                room_id: id,
                capacity: 2,
            },
            DomainError::UserAlreadyInRoom(id),
            DomainError::UserBannedInRoom(id),
            DomainError::ActionNotAllowed("kick".into()),
            DomainError::MediaNotAvailable(id),
            DomainError::ViewerNotFound(id),
            DomainError::Validation("empty".into()),
        ];

        for error in errors {
            assert!(error.is_user_facing(), "{error:?} should be user facing");
            assert!(!error.is_transient(), "{error:?} should not be retried");
        }
    }

    #[test]
    fn test_infrastructure_error_is_transient_and_systemic() {
        let error = DomainError::Infrastructure("connection refused".into());

        assert!(error.is_transient());
        assert!(!error.is_user_facing());
        assert_eq!(error.code(), "infrastructure_error");
    }

    #[test]
    fn test_room_busy_is_systemic_but_not_retried() {
        let error = DomainError::RoomBusy(Uuid::new_v4());

        assert!(!error.is_user_facing());
        assert!(!error.is_transient());
        assert_eq!(error.code(), "room_busy");
    }

    #[test]
    fn test_room_is_full_message_names_capacity() {
        let room_id = Uuid::new_v4();
        let error = DomainError::RoomIsFull {
            room_id,
            capacity: 10,
        };

        assert_eq!(
            error.to_string(),
            format!("room {room_id} is full (capacity 10)")
        );
    }
}
