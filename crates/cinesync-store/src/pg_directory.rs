//! `PostgreSQL` lookups for the user directory and media catalog.
//!
//! Both tables are owned by other services; the room engine only reads them.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use cinesync_core::collaborators::{MediaAvailability, UserLookup, UserProfile};
use cinesync_core::error::DomainError;

use crate::database_error;

/// Reads user profiles from the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserLookup {
    pool: PgPool,
}

impl PgUserLookup {
    /// Creates a new `PgUserLookup`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserLookup for PgUserLookup {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, DomainError> {
        let row: Option<(Uuid, String, Option<String>)> =
            sqlx::query_as("SELECT id, name, photo_ref FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error(&e))?;
        Ok(row.map(|(user_id, name, photo_ref)| UserProfile {
            user_id,
            name,
            photo_ref,
        }))
    }
}

/// Reads media readiness from the `media` table. Unknown media is treated
/// as unavailable.
#[derive(Debug, Clone)]
pub struct PgMediaAvailability {
    pool: PgPool,
}

impl PgMediaAvailability {
    /// Creates a new `PgMediaAvailability`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaAvailability for PgMediaAvailability {
    async fn is_available(&self, media_id: Uuid) -> Result<bool, DomainError> {
        let row: Option<(bool,)> = sqlx::query_as("SELECT ready FROM media WHERE id = $1")
            .bind(media_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;
        Ok(row.is_some_and(|(ready,)| ready))
    }
}
