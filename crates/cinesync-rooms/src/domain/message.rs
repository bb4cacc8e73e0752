//! The chat message aggregate.

use chrono::{DateTime, Utc};
use cinesync_core::clock::Clock;
use cinesync_core::error::DomainError;
use cinesync_core::repository::StoredMessage;
use uuid::Uuid;

use super::aggregates::Room;

/// Longest accepted message, in characters, after normalization.
pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// A chat message posted by a viewer of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message identifier.
    pub id: Uuid,
    /// Room the message belongs to.
    pub room_id: Uuid,
    /// Author.
    pub user_id: Uuid,
    /// Normalized text.
    pub text: String,
    /// Send time.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Creates a message from `user_id` in `room`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ViewerNotFound` if the author is not a viewer of
    /// the room, and `DomainError::Validation` if the normalized text is empty
    /// or longer than [`MAX_MESSAGE_LENGTH`].
    pub fn new(
        room: &Room,
        user_id: Uuid,
        raw_text: &str,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        if !room.is_viewer(user_id) {
            return Err(DomainError::ViewerNotFound(user_id));
        }

        let text = normalize_text(raw_text);
        if text.is_empty() {
            return Err(DomainError::Validation(
                "message text must not be empty".to_owned(),
            ));
        }
        if text.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(DomainError::Validation(format!(
                "message text exceeds {MAX_MESSAGE_LENGTH} characters"
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            room_id: room.id,
            user_id,
            text,
            sent_at: clock.now(),
        })
    }

    /// The persisted form of this message.
    #[must_use]
    pub fn to_stored(&self) -> StoredMessage {
        StoredMessage {
            id: self.id,
            room_id: self.room_id,
            user_id: self.user_id,
            text: self.text.clone(),
            sent_at: self.sent_at,
        }
    }
}

/// Collapses every run of line breaks into one space and trims the result.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut in_break = false;
    for ch in raw.chars() {
        if ch == '\n' || ch == '\r' {
            if !in_break {
                normalized.push(' ');
                in_break = true;
            }
        } else {
            normalized.push(ch);
            in_break = false;
        }
    }
    normalized.trim().to_owned()
}
