//! Contracts for the external systems the room engine consults.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;

/// Public profile of a user, as provided by the user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// The user's identifier.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Avatar reference.
    pub photo_ref: Option<String>,
}

/// Resolves user ids to profiles.
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Returns the user's profile, or `None` if the user does not exist.
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DomainError>;
}

/// Answers whether a media item is ready for playback.
#[async_trait]
pub trait MediaAvailability: Send + Sync {
    /// Returns `true` when the media exists and can be streamed.
    async fn is_available(&self, media_id: Uuid) -> Result<bool, DomainError>;
}
