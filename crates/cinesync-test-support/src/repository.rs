//! Test repositories — in-memory and failing `RoomRepository` and
//! `MessageRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cinesync_core::error::DomainError;
use cinesync_core::repository::{MessageRepository, RoomRepository, RoomSnapshot, StoredMessage};
use uuid::Uuid;

/// A room repository that keeps snapshots in memory, enforces the version
/// check on save, and counts every call.
///
/// `fail_next(n)` makes the next `n` calls fail with an infrastructure
/// error; `with_save_delay` slows saves down so tests can interleave
/// commands.
#[derive(Debug, Default)]
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<Uuid, RoomSnapshot>>,
    loads: AtomicUsize,
    saves: AtomicUsize,
    deletes: AtomicUsize,
    failures_left: AtomicUsize,
    save_delay: Option<Duration>,
}

impl InMemoryRoomRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every save by `delay`.
    #[must_use]
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    /// Store `snapshot` directly, bypassing the version check.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert(&self, snapshot: RoomSnapshot) {
        self.rooms.lock().unwrap().insert(snapshot.id, snapshot);
    }

    /// The stored snapshot of a room.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn snapshot(&self, room_id: Uuid) -> Option<RoomSnapshot> {
        self.rooms.lock().unwrap().get(&room_id).cloned()
    }

    /// Make the next `count` calls fail.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Number of `load` calls so far.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of `save` calls so far, failed ones included.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls so far, failed ones included.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn injected_failure(&self) -> Result<(), DomainError> {
        let took = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        match took {
            Ok(_) => Err(DomainError::Infrastructure("connection refused".into())),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn load(&self, room_id: Uuid) -> Result<Option<RoomSnapshot>, DomainError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        Ok(self.rooms.lock().unwrap().get(&room_id).cloned())
    }

    async fn save(&self, snapshot: &RoomSnapshot, expected_version: i64) -> Result<(), DomainError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }
        self.injected_failure()?;

        let mut rooms = self.rooms.lock().unwrap();
        let actual = rooms.get(&snapshot.id).map_or(0, |stored| stored.version);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                room_id: snapshot.id,
                expected: expected_version,
                actual,
            });
        }
        rooms.insert(snapshot.id, snapshot.clone());
        Ok(())
    }

    async fn delete(&self, room_id: Uuid) -> Result<(), DomainError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.injected_failure()?;
        self.rooms.lock().unwrap().remove(&room_id);
        Ok(())
    }
}

/// A room repository that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingRoomRepository;

#[async_trait]
impl RoomRepository for FailingRoomRepository {
    async fn load(&self, _room_id: Uuid) -> Result<Option<RoomSnapshot>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save(
        &self,
        _snapshot: &RoomSnapshot,
        _expected_version: i64,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete(&self, _room_id: Uuid) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// A message repository that keeps messages in memory.
#[derive(Debug, Default)]
pub struct InMemoryMessageRepository {
    messages: Mutex<Vec<StoredMessage>>,
}

impl InMemoryMessageRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages appended so far, in append order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn all(&self) -> Vec<StoredMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: &StoredMessage) -> Result<(), DomainError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn recent(&self, room_id: Uuid, limit: usize) -> Result<Vec<StoredMessage>, DomainError> {
        let messages = self.messages.lock().unwrap();
        let in_room: Vec<StoredMessage> = messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        let skip = in_room.len().saturating_sub(limit);
        Ok(in_room.into_iter().skip(skip).collect())
    }
}

/// A message repository that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingMessageRepository;

#[async_trait]
impl MessageRepository for FailingMessageRepository {
    async fn append(&self, _message: &StoredMessage) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn recent(
        &self,
        _room_id: Uuid,
        _limit: usize,
    ) -> Result<Vec<StoredMessage>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
