//! Static collaborator doubles.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use cinesync_core::collaborators::{MediaAvailability, UserLookup, UserProfile};
use cinesync_core::error::DomainError;
use uuid::Uuid;

/// A user directory backed by a fixed set of profiles.
#[derive(Debug, Default)]
pub struct StaticUserDirectory {
    users: HashMap<Uuid, UserProfile>,
}

impl StaticUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user and return its profile.
    pub fn add(&mut self, name: &str) -> UserProfile {
        let profile = UserProfile {
            user_id: Uuid::new_v4(),
            name: name.to_owned(),
            photo_ref: Some(format!("photos/{}.png", name.to_lowercase())),
        };
        self.users.insert(profile.user_id, profile.clone());
        profile
    }
}

#[async_trait]
impl UserLookup for StaticUserDirectory {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DomainError> {
        Ok(self.users.get(&user_id).cloned())
    }
}

/// A media catalog that knows which media ids are ready.
#[derive(Debug, Default)]
pub struct StaticMediaCatalog {
    ready: HashSet<Uuid>,
}

impl StaticMediaCatalog {
    /// Create a catalog where only `ready` media can be played.
    #[must_use]
    pub fn with_ready(ready: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            ready: ready.into_iter().collect(),
        }
    }
}

#[async_trait]
impl MediaAvailability for StaticMediaCatalog {
    async fn is_available(&self, media_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.ready.contains(&media_id))
    }
}
