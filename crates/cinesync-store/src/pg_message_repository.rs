//! `PostgreSQL` implementation of the `MessageRepository` trait.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use cinesync_core::error::DomainError;
use cinesync_core::repository::{MessageRepository, StoredMessage};

use crate::database_error;

/// PostgreSQL-backed chat history.
#[derive(Debug, Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a new `PgMessageRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn append(&self, message: &StoredMessage) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO room_messages (id, room_id, user_id, text, sent_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(message.id)
        .bind(message.room_id)
        .bind(message.user_id)
        .bind(&message.text)
        .bind(message.sent_at)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error(&e))?;
        Ok(())
    }

    async fn recent(&self, room_id: Uuid, limit: usize) -> Result<Vec<StoredMessage>, DomainError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<(Uuid, Uuid, Uuid, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
            "SELECT id, room_id, user_id, text, sent_at FROM ( \
                 SELECT id, room_id, user_id, text, sent_at FROM room_messages \
                 WHERE room_id = $1 ORDER BY sent_at DESC, id DESC LIMIT $2 \
             ) latest ORDER BY sent_at ASC, id ASC",
        )
        .bind(room_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error(&e))?;

        Ok(rows
            .into_iter()
            .map(|(id, room_id, user_id, text, sent_at)| StoredMessage {
                id,
                room_id,
                user_id,
                text,
                sent_at,
            })
            .collect())
    }
}
