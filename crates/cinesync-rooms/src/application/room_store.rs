//! The room store: a cache of working copies in front of the durable
//! repository, with per-room mutual exclusion.
//!
//! Each room id maps to a slot guarded by a `tokio::sync::Mutex`. The cached
//! working copy lives inside the slot, so only the holder of a
//! [`RoomLease`] can read or mutate it. A lease is acquired before the room is
//! loaded and released after it has been saved and its events published,
//! which serializes every command on a room and closes the lost-update race.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cinesync_core::aggregate::AggregateRoot;
use cinesync_core::clock::Clock;
use cinesync_core::error::DomainError;
use cinesync_core::repository::{MessageRepository, RoomRepository, RoomSnapshot, StoredMessage};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use super::retry::RetryPolicy;
use crate::domain::aggregates::{PlaybackPolicy, Room};
use crate::domain::events::RoomEvent;

/// Default idle time after which a cached room is evicted.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Default bounded wait for the per-room exclusion.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables of the room store.
#[derive(Debug, Clone, Copy)]
pub struct RoomStoreConfig {
    /// Cached rooms idle for longer are dropped from memory.
    pub idle_ttl: Duration,
    /// How long a command waits for the room before failing `RoomBusy`.
    pub lock_timeout: Duration,
    /// Retry policy for repository calls.
    pub retry: RetryPolicy,
    /// Playback policy applied to rooms rebuilt from storage.
    pub playback_policy: PlaybackPolicy,
}

impl Default for RoomStoreConfig {
    fn default() -> Self {
        Self {
            idle_ttl: DEFAULT_IDLE_TTL,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            retry: RetryPolicy::default(),
            playback_policy: PlaybackPolicy::default(),
        }
    }
}

struct CachedRoom {
    room: Room,
    last_touched: DateTime<Utc>,
}

#[derive(Default)]
struct Slot {
    cached: Option<CachedRoom>,
}

struct Inner {
    rooms: Arc<dyn RoomRepository>,
    messages: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
    config: RoomStoreConfig,
    slots: DashMap<Uuid, Arc<Mutex<Slot>>>,
    committed: DashMap<Uuid, Arc<RoomSnapshot>>,
}

/// Single point of truth for the current working copy of every room.
#[derive(Clone)]
pub struct RoomStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RoomStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomStore")
            .field("slots", &self.inner.slots.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl RoomStore {
    /// Creates a store over the given repositories.
    #[must_use]
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        messages: Arc<dyn MessageRepository>,
        clock: Arc<dyn Clock>,
        config: RoomStoreConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                rooms,
                messages,
                clock,
                config,
                slots: DashMap::new(),
                committed: DashMap::new(),
            }),
        }
    }

    /// The store's configuration.
    #[must_use]
    pub fn config(&self) -> &RoomStoreConfig {
        &self.inner.config
    }

    /// Acquires the exclusion for `room_id`, waiting at most the configured
    /// lock timeout.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomBusy` if the wait times out.
    pub async fn acquire(&self, room_id: Uuid) -> Result<RoomLease, DomainError> {
        let slot = Arc::clone(self.inner.slots.entry(room_id).or_default().value());
        let guard = tokio::time::timeout(self.inner.config.lock_timeout, slot.lock_owned())
            .await
            .map_err(|_| {
                warn!(room_id = %room_id, "timed out waiting for room exclusion");
                DomainError::RoomBusy(room_id)
            })?;
        Ok(RoomLease {
            store: self.clone(),
            room_id,
            guard,
            staged_messages: Vec::new(),
        })
    }

    /// The last committed snapshot of a room, read without the exclusion.
    /// Falls back to the repository when the room is not cached.
    ///
    /// # Errors
    ///
    /// Returns repository errors that survive the retry policy.
    pub async fn peek(&self, room_id: Uuid) -> Result<Option<Arc<RoomSnapshot>>, DomainError> {
        if let Some(snapshot) = self.inner.committed.get(&room_id) {
            return Ok(Some(Arc::clone(snapshot.value())));
        }
        let rooms = &self.inner.rooms;
        let loaded = self
            .inner
            .config
            .retry
            .run("room.load", || rooms.load(room_id))
            .await?;
        Ok(loaded.map(Arc::new))
    }

    /// The latest `limit` messages of a room, oldest first.
    ///
    /// # Errors
    ///
    /// Returns repository errors that survive the retry policy.
    pub async fn recent_messages(
        &self,
        room_id: Uuid,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, DomainError> {
        let messages = &self.inner.messages;
        self.inner
            .config
            .retry
            .run("message.recent", || messages.recent(room_id, limit))
            .await
    }

    /// Drops cached rooms idle for longer than the TTL, skipping any room a
    /// command currently holds or waits for. Storage is untouched. Returns the
    /// number of working copies dropped.
    pub fn evict_idle(&self) -> usize {
        let clock = &self.inner.clock;
        let idle_ttl = self.inner.config.idle_ttl;
        let committed = &self.inner.committed;
        let mut evicted = 0;

        self.inner.slots.retain(|room_id, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let Ok(mut guard) = slot.try_lock() else {
                return true;
            };
            if let Some(cached) = &guard.cached {
                let idle = clock
                    .elapsed_since(cached.last_touched)
                    .to_std()
                    .unwrap_or_default();
                if idle <= idle_ttl {
                    return true;
                }
                guard.cached = None;
                evicted += 1;
                debug!(room_id = %room_id, "evicted idle room from cache");
            }
            committed.remove(room_id);
            false
        });
        evicted
    }

    /// Number of rooms with a cached working copy.
    #[must_use]
    pub fn cached_rooms(&self) -> usize {
        self.inner
            .slots
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .try_lock()
                    .map_or(true, |slot| slot.cached.is_some())
            })
            .count()
    }
}

/// Exclusive access to one room for the duration of a command.
///
/// Dropping the lease releases the room.
pub struct RoomLease {
    store: RoomStore,
    room_id: Uuid,
    guard: OwnedMutexGuard<Slot>,
    staged_messages: Vec<StoredMessage>,
}

impl std::fmt::Debug for RoomLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomLease")
            .field("room_id", &self.room_id)
            .field("cached", &self.guard.cached.is_some())
            .field("staged_messages", &self.staged_messages.len())
            .finish()
    }
}

impl RoomLease {
    /// The leased room id.
    #[must_use]
    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    /// The cached working copy, if one is loaded.
    #[must_use]
    pub fn room(&self) -> Option<&Room> {
        self.guard.cached.as_ref().map(|cached| &cached.room)
    }

    /// Returns the cached working copy if it is still fresh, loading it from
    /// the repository otherwise.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if no persisted room exists, or
    /// repository errors that survive the retry policy.
    pub async fn get_or_load(&mut self) -> Result<&mut Room, DomainError> {
        if !self.is_fresh() {
            self.guard.cached = None;
            let inner = &self.store.inner;
            let room_id = self.room_id;
            let snapshot = inner
                .config
                .retry
                .run("room.load", || inner.rooms.load(room_id))
                .await?
                .ok_or(DomainError::RoomNotFound(room_id))?;
            let room = Room::from_snapshot(snapshot.clone(), inner.config.playback_policy)?;
            inner.committed.insert(room_id, Arc::new(snapshot));
            debug!(room_id = %room_id, version = room.version(), "loaded room into cache");
            self.guard.cached = Some(CachedRoom {
                room,
                last_touched: inner.clock.now(),
            });
        }

        match self.guard.cached.as_mut() {
            Some(cached) => Ok(&mut cached.room),
            None => Err(DomainError::RoomNotFound(self.room_id)),
        }
    }

    /// Installs a newly created room as the working copy. The next
    /// [`RoomLease::commit`] inserts it into the repository.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the room id differs from the
    /// leased id or the room was already persisted.
    pub fn install(&mut self, room: Room) -> Result<(), DomainError> {
        if room.id != self.room_id || room.version() != 0 {
            return Err(DomainError::Validation(format!(
                "room {} cannot be installed into slot {}",
                room.id, self.room_id
            )));
        }
        self.guard.cached = Some(CachedRoom {
            room,
            last_touched: self.store.inner.clock.now(),
        });
        Ok(())
    }

    /// Queues a chat message to be appended when the lease commits.
    pub fn stage_message(&mut self, message: StoredMessage) {
        self.staged_messages.push(message);
    }

    /// Persists the working copy and returns the events to publish, in the
    /// order they were recorded.
    ///
    /// The write runs on its own task that owns the lease, so dropping the
    /// returned future never aborts an in-flight save; the room is released
    /// only once the write has finished. On failure the cached working copy
    /// is invalidated, the recorded events are discarded and the lease is
    /// released.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` on a version mismatch, or
    /// repository errors that survive the retry policy.
    pub async fn commit(self) -> Result<(Self, Vec<RoomEvent>), DomainError> {
        let room_id = self.room_id;
        let task = tokio::spawn(async move {
            let mut lease = self;
            let outcome = lease.persist().await;
            (lease, outcome)
        });
        match task.await {
            Ok((lease, Ok(events))) => Ok((lease, events)),
            Ok((_, Err(e))) => Err(e),
            Err(join_error) => Err(DomainError::Infrastructure(format!(
                "save task for room {room_id} failed: {join_error}"
            ))),
        }
    }

    /// Removes the room from the repository and the cache, returning the
    /// events recorded by the closing command.
    ///
    /// Runs on its own task like [`RoomLease::commit`].
    ///
    /// # Errors
    ///
    /// Returns repository errors that survive the retry policy.
    pub async fn delete(self) -> Result<(Self, Vec<RoomEvent>), DomainError> {
        let room_id = self.room_id;
        let task = tokio::spawn(async move {
            let mut lease = self;
            let outcome = lease.remove().await;
            (lease, outcome)
        });
        match task.await {
            Ok((lease, Ok(events))) => Ok((lease, events)),
            Ok((_, Err(e))) => Err(e),
            Err(join_error) => Err(DomainError::Infrastructure(format!(
                "delete task for room {room_id} failed: {join_error}"
            ))),
        }
    }

    fn is_fresh(&self) -> bool {
        let inner = &self.store.inner;
        self.guard.cached.as_ref().is_some_and(|cached| {
            let idle = inner
                .clock
                .elapsed_since(cached.last_touched)
                .to_std()
                .unwrap_or_default();
            idle <= inner.config.idle_ttl
        })
    }

    async fn persist(&mut self) -> Result<Vec<RoomEvent>, DomainError> {
        let inner = Arc::clone(&self.store.inner);
        let room_id = self.room_id;
        let staged = std::mem::take(&mut self.staged_messages);

        let Some(cached) = self.guard.cached.as_mut() else {
            return Err(DomainError::RoomNotFound(room_id));
        };
        let expected_version = cached.room.version();
        let snapshot = cached.room.to_snapshot(expected_version + 1);

        let saved = inner
            .config
            .retry
            .run("room.save", || inner.rooms.save(&snapshot, expected_version))
            .await;
        if let Err(e) = saved {
            warn!(room_id = %room_id, error = %e, "room save failed, invalidating cached copy");
            self.guard.cached = None;
            return Err(e);
        }

        cached.room.version = expected_version + 1;
        cached.last_touched = inner.clock.now();
        let events = cached.room.take_uncommitted_events();
        inner.committed.insert(room_id, Arc::new(snapshot));

        for message in &staged {
            inner
                .config
                .retry
                .run("message.append", || inner.messages.append(message))
                .await
                .inspect_err(|e| {
                    warn!(room_id = %room_id, message_id = %message.id, error = %e, "message append failed");
                })?;
        }

        debug!(room_id = %room_id, version = expected_version + 1, events = events.len(), "room saved");
        Ok(events)
    }

    async fn remove(&mut self) -> Result<Vec<RoomEvent>, DomainError> {
        let inner = Arc::clone(&self.store.inner);
        let room_id = self.room_id;
        let events = self
            .guard
            .cached
            .as_mut()
            .map(|cached| cached.room.take_uncommitted_events())
            .unwrap_or_default();
        self.guard.cached = None;

        inner
            .config
            .retry
            .run("room.delete", || inner.rooms.delete(room_id))
            .await
            .inspect_err(|e| warn!(room_id = %room_id, error = %e, "room delete failed"))?;
        inner.committed.remove(&room_id);
        debug!(room_id = %room_id, "room deleted");
        Ok(events)
    }
}
