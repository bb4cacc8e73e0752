//! `PostgreSQL` implementation of the `RoomRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::debug;
use uuid::Uuid;

use cinesync_core::error::DomainError;
use cinesync_core::repository::{PlaybackSnapshot, RoomRepository, RoomSnapshot, ViewerSnapshot};

use crate::database_error;

/// PostgreSQL-backed room repository. Snapshots are stored one row per room
/// with viewers, bans and playback as JSONB; saves are conditional on the
/// stored version.
#[derive(Debug, Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    /// Creates a new `PgRoomRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_version(&self, room_id: Uuid) -> Result<i64, DomainError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;
        Ok(row.map_or(0, |(version,)| version))
    }
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: Uuid,
    owner_id: Uuid,
    media_id: Uuid,
    code: Option<String>,
    capacity: i32,
    viewers: Json<Vec<ViewerSnapshot>>,
    banned_users: Json<Vec<Uuid>>,
    playback: Json<PlaybackSnapshot>,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    event_sequence: i64,
    version: i64,
}

impl TryFrom<RoomRow> for RoomSnapshot {
    type Error = DomainError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        let capacity = usize::try_from(row.capacity).map_err(|_| {
            DomainError::Infrastructure(format!(
                "room {} has invalid capacity {}",
                row.id, row.capacity
            ))
        })?;
        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            media_id: row.media_id,
            code: row.code,
            capacity,
            viewers: row.viewers.0,
            banned_users: row.banned_users.0,
            playback: row.playback.0,
            created_at: row.created_at,
            last_activity_at: row.last_activity_at,
            event_sequence: row.event_sequence,
            version: row.version,
        })
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn load(&self, room_id: Uuid) -> Result<Option<RoomSnapshot>, DomainError> {
        let row: Option<RoomRow> = sqlx::query_as(
            "SELECT id, owner_id, media_id, code, capacity, viewers, banned_users, playback, \
             created_at, last_activity_at, event_sequence, version \
             FROM rooms WHERE id = $1",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error(&e))?;

        row.map(RoomSnapshot::try_from).transpose()
    }

    async fn save(&self, snapshot: &RoomSnapshot, expected_version: i64) -> Result<(), DomainError> {
        let capacity = i32::try_from(snapshot.capacity).map_err(|_| {
            DomainError::Validation(format!("capacity {} is too large", snapshot.capacity))
        })?;

        let result = if expected_version == 0 {
            sqlx::query(
                "INSERT INTO rooms (id, owner_id, media_id, code, capacity, viewers, banned_users, \
                 playback, created_at, last_activity_at, event_sequence, version) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(snapshot.id)
            .bind(snapshot.owner_id)
            .bind(snapshot.media_id)
            .bind(&snapshot.code)
            .bind(capacity)
            .bind(Json(&snapshot.viewers))
            .bind(Json(&snapshot.banned_users))
            .bind(Json(&snapshot.playback))
            .bind(snapshot.created_at)
            .bind(snapshot.last_activity_at)
            .bind(snapshot.event_sequence)
            .bind(snapshot.version)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                "UPDATE rooms SET code = $2, capacity = $3, viewers = $4, banned_users = $5, \
                 playback = $6, last_activity_at = $7, event_sequence = $8, version = $9 \
                 WHERE id = $1 AND version = $10",
            )
            .bind(snapshot.id)
            .bind(&snapshot.code)
            .bind(capacity)
            .bind(Json(&snapshot.viewers))
            .bind(Json(&snapshot.banned_users))
            .bind(Json(&snapshot.playback))
            .bind(snapshot.last_activity_at)
            .bind(snapshot.event_sequence)
            .bind(snapshot.version)
            .bind(expected_version)
            .execute(&self.pool)
            .await
        }
        .map_err(|e| database_error(&e))?;

        if result.rows_affected() == 0 {
            let actual = self.current_version(snapshot.id).await?;
            return Err(DomainError::ConcurrencyConflict {
                room_id: snapshot.id,
                expected: expected_version,
                actual,
            });
        }

        debug!(room_id = %snapshot.id, version = snapshot.version, "room snapshot saved");
        Ok(())
    }

    async fn delete(&self, room_id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;
        Ok(())
    }
}
