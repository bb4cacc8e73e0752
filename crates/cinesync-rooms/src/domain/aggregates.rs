//! Aggregate roots for the room context.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use cinesync_core::aggregate::AggregateRoot;
use cinesync_core::clock::Clock;
use cinesync_core::collaborators::UserProfile;
use cinesync_core::error::DomainError;
use cinesync_core::event::EventMetadata;
use cinesync_core::repository::{PlaybackSnapshot, RoomSnapshot, ViewerSnapshot};
use uuid::Uuid;

use super::events::{
    EpisodeChanged, FullscreenChanged, MessageSent, PauseChanged, RoomClosed, RoomCreated,
    RoomEvent, RoomEventKind, SpeedChanged, TimeLineChanged, ViewerDisconnected, ViewerJoined,
    ViewerKicked, ViewerLeft, ViewerNudged, ViewerReconnected,
};
use super::message::Message;

/// Room lifecycle. `PendingDelete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// Accepting commands.
    Active,
    /// The owner left; the room accepts nothing more and is being removed.
    PendingDelete,
}

/// Who may drive shared playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPolicy {
    /// Only the owner may pause, seek, switch episode, change speed or
    /// toggle fullscreen.
    #[default]
    OwnerOnly,
    /// Every viewer may drive playback.
    AnyViewer,
}

/// Settings applied to rooms by the service configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSettings {
    /// Capacity stamped on newly created rooms.
    pub capacity: usize,
    /// Playback policy enforced on every room.
    pub playback_policy: PlaybackPolicy,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            capacity: 10,
            playback_policy: PlaybackPolicy::OwnerOnly,
        }
    }
}

/// A member of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    /// Display name.
    pub name: String,
    /// Avatar reference.
    pub photo_ref: Option<String>,
    /// Whether the viewer has a live connection.
    pub online: bool,
    /// The viewer's current connection.
    pub connection_id: Option<Uuid>,
}

/// Shared playback state. Advisory: clients treat it as authoritative only
/// while the driving viewer is online.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    /// Whether playback is paused.
    pub paused: bool,
    /// Position in 100ns ticks.
    pub position_ticks: i64,
    /// Selected season.
    pub season: Option<i32>,
    /// Selected episode.
    pub episode: Option<i32>,
    /// Playback rate.
    pub speed: f32,
    /// Fullscreen flag.
    pub fullscreen: bool,
}

impl From<PlaybackSnapshot> for Playback {
    fn from(snapshot: PlaybackSnapshot) -> Self {
        Self {
            paused: snapshot.paused,
            position_ticks: snapshot.position_ticks,
            season: snapshot.season,
            episode: snapshot.episode,
            speed: snapshot.speed,
            fullscreen: snapshot.fullscreen,
        }
    }
}

impl From<&Playback> for PlaybackSnapshot {
    fn from(playback: &Playback) -> Self {
        Self {
            paused: playback.paused,
            position_ticks: playback.position_ticks,
            season: playback.season,
            episode: playback.episode,
            speed: playback.speed,
            fullscreen: playback.fullscreen,
        }
    }
}

/// The aggregate root for a watch room.
///
/// Every operation validates its preconditions first and either mutates the
/// room and records events, or fails without touching anything.
#[derive(Debug)]
pub struct Room {
    /// Aggregate identifier.
    pub id: Uuid,
    owner_id: Uuid,
    media_id: Uuid,
    code: Option<String>,
    capacity: usize,
    playback_policy: PlaybackPolicy,
    viewers: HashMap<Uuid, Viewer>,
    banned_users: HashSet<Uuid>,
    playback: Playback,
    state: RoomState,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    event_sequence: i64,
    /// Number of successful saves.
    pub(crate) version: i64,
    /// Uncommitted events pending delivery.
    uncommitted_events: Vec<RoomEvent>,
}

impl Room {
    /// Creates a new active room with `owner` as its first, offline viewer.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the capacity is zero.
    pub fn create(
        id: Uuid,
        owner: &UserProfile,
        media_id: Uuid,
        code: Option<String>,
        settings: RoomSettings,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        if settings.capacity == 0 {
            return Err(DomainError::Validation(
                "room capacity must be at least 1".to_owned(),
            ));
        }

        let now = clock.now();
        let mut viewers = HashMap::new();
        viewers.insert(
            owner.user_id,
            Viewer {
                name: owner.name.clone(),
                photo_ref: owner.photo_ref.clone(),
                online: false,
                connection_id: None,
            },
        );

        let mut room = Self {
            id,
            owner_id: owner.user_id,
            media_id,
            code,
            capacity: settings.capacity,
            playback_policy: settings.playback_policy,
            viewers,
            banned_users: HashSet::new(),
            playback: PlaybackSnapshot::default().into(),
            state: RoomState::Active,
            created_at: now,
            last_activity_at: now,
            event_sequence: 0,
            version: 0,
            uncommitted_events: Vec::new(),
        };
        room.record(
            RoomEventKind::RoomCreated(RoomCreated {
                owner_id: owner.user_id,
                media_id,
            }),
            correlation_id,
            clock,
        );
        Ok(room)
    }

    /// Rebuilds a room from its persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the snapshot breaks a room
    /// invariant (zero capacity, owner missing from viewers, or a banned user
    /// listed as a viewer).
    pub fn from_snapshot(
        snapshot: RoomSnapshot,
        playback_policy: PlaybackPolicy,
    ) -> Result<Self, DomainError> {
        let corrupt = |reason: &str| {
            DomainError::Infrastructure(format!("invalid snapshot for room {}: {reason}", snapshot.id))
        };

        if snapshot.capacity == 0 {
            return Err(corrupt("capacity is zero"));
        }
        let banned_users: HashSet<Uuid> = snapshot.banned_users.iter().copied().collect();
        if snapshot
            .viewers
            .iter()
            .any(|v| banned_users.contains(&v.user_id))
        {
            return Err(corrupt("a banned user is listed as a viewer"));
        }
        if !snapshot.viewers.iter().any(|v| v.user_id == snapshot.owner_id) {
            return Err(corrupt("owner is not a viewer"));
        }

        let viewers = snapshot
            .viewers
            .into_iter()
            .map(|v| {
                (
                    v.user_id,
                    Viewer {
                        name: v.name,
                        photo_ref: v.photo_ref,
                        online: v.online,
                        connection_id: v.connection_id,
                    },
                )
            })
            .collect();

        Ok(Self {
            id: snapshot.id,
            owner_id: snapshot.owner_id,
            media_id: snapshot.media_id,
            code: snapshot.code,
            capacity: snapshot.capacity,
            playback_policy,
            viewers,
            banned_users,
            playback: snapshot.playback.into(),
            state: RoomState::Active,
            created_at: snapshot.created_at,
            last_activity_at: snapshot.last_activity_at,
            event_sequence: snapshot.event_sequence,
            version: snapshot.version,
            uncommitted_events: Vec::new(),
        })
    }

    /// The persisted form of this room, stamped with `version`.
    #[must_use]
    pub fn to_snapshot(&self, version: i64) -> RoomSnapshot {
        let mut viewers: Vec<ViewerSnapshot> = self
            .viewers
            .iter()
            .map(|(user_id, v)| ViewerSnapshot {
                user_id: *user_id,
                name: v.name.clone(),
                photo_ref: v.photo_ref.clone(),
                online: v.online,
                connection_id: v.connection_id,
            })
            .collect();
        viewers.sort_by_key(|v| v.user_id);
        let mut banned_users: Vec<Uuid> = self.banned_users.iter().copied().collect();
        banned_users.sort_unstable();

        RoomSnapshot {
            id: self.id,
            owner_id: self.owner_id,
            media_id: self.media_id,
            code: self.code.clone(),
            capacity: self.capacity,
            viewers,
            banned_users,
            playback: (&self.playback).into(),
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
            event_sequence: self.event_sequence,
            version,
        }
    }

    /// The viewer with moderation authority.
    #[must_use]
    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    /// The media being watched.
    #[must_use]
    pub fn media_id(&self) -> Uuid {
        self.media_id
    }

    /// The join code, for private rooms.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Maximum number of viewers.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current viewers keyed by user id.
    #[must_use]
    pub fn viewers(&self) -> &HashMap<Uuid, Viewer> {
        &self.viewers
    }

    /// Looks up a viewer.
    #[must_use]
    pub fn viewer(&self, user_id: Uuid) -> Option<&Viewer> {
        self.viewers.get(&user_id)
    }

    /// Whether `user_id` is a viewer of this room.
    #[must_use]
    pub fn is_viewer(&self, user_id: Uuid) -> bool {
        self.viewers.contains_key(&user_id)
    }

    /// Whether `user_id` is banned from this room.
    #[must_use]
    pub fn is_banned(&self, user_id: Uuid) -> bool {
        self.banned_users.contains(&user_id)
    }

    /// Shared playback state.
    #[must_use]
    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> RoomState {
        self.state
    }

    /// Time of the last mutating action.
    #[must_use]
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    /// Adds or reactivates a viewer on `connection_id`.
    ///
    /// A viewer that is already online only swaps its connection and records
    /// a presence update instead of a second join.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if the room is closing,
    /// `DomainError::UserBannedInRoom` for banned users,
    /// `DomainError::InvalidCode` if a newcomer presents the wrong code, and
    /// `DomainError::RoomIsFull` when a newcomer would exceed the capacity.
    pub fn connect(
        &mut self,
        user: &UserProfile,
        code: Option<&str>,
        connection_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        if self.banned_users.contains(&user.user_id) {
            return Err(DomainError::UserBannedInRoom(user.user_id));
        }

        if let Some(viewer) = self.viewers.get_mut(&user.user_id) {
            let was_online = viewer.online;
            viewer.online = true;
            viewer.connection_id = Some(connection_id);
            viewer.name.clone_from(&user.name);
            viewer.photo_ref.clone_from(&user.photo_ref);

            let kind = if was_online {
                RoomEventKind::ViewerReconnected(ViewerReconnected {
                    user_id: user.user_id,
                    connection_id,
                })
            } else {
                RoomEventKind::ViewerJoined(ViewerJoined {
                    user_id: user.user_id,
                    name: user.name.clone(),
                    photo_ref: user.photo_ref.clone(),
                    connection_id,
                })
            };
            self.touch(clock);
            self.record(kind, correlation_id, clock);
            return Ok(());
        }

        if let Some(expected) = self.code.as_deref() {
            if code != Some(expected) {
                return Err(DomainError::InvalidCode);
            }
        }
        if self.viewers.len() >= self.capacity {
            return Err(DomainError::RoomIsFull {
                room_id: self.id,
                capacity: self.capacity,
            });
        }

        self.viewers.insert(
            user.user_id,
            Viewer {
                name: user.name.clone(),
                photo_ref: user.photo_ref.clone(),
                online: true,
                connection_id: Some(connection_id),
            },
        );
        self.touch(clock);
        self.record(
            RoomEventKind::ViewerJoined(ViewerJoined {
                user_id: user.user_id,
                name: user.name.clone(),
                photo_ref: user.photo_ref.clone(),
                connection_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Marks the viewer offline if `connection_id` is still its current
    /// connection. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if the room is closing.
    pub fn disconnect(
        &mut self,
        user_id: Uuid,
        connection_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<bool, DomainError> {
        self.ensure_active()?;
        let Some(viewer) = self.viewers.get_mut(&user_id) else {
            return Ok(false);
        };
        if !viewer.online || viewer.connection_id != Some(connection_id) {
            return Ok(false);
        }

        viewer.online = false;
        viewer.connection_id = None;
        self.touch(clock);
        self.record(
            RoomEventKind::ViewerDisconnected(ViewerDisconnected { user_id }),
            correlation_id,
            clock,
        );
        Ok(true)
    }

    /// Removes a viewer. When the owner leaves, the room moves to
    /// `PendingDelete`; ownership never transfers.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if the room is closing and
    /// `DomainError::ViewerNotFound` if the user is not a viewer.
    pub fn leave(
        &mut self,
        user_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        if self.viewers.remove(&user_id).is_none() {
            return Err(DomainError::ViewerNotFound(user_id));
        }

        self.touch(clock);
        self.record(
            RoomEventKind::ViewerLeft(ViewerLeft { user_id }),
            correlation_id,
            clock,
        );
        if user_id == self.owner_id {
            self.state = RoomState::PendingDelete;
            self.record(
                RoomEventKind::RoomClosed(RoomClosed { owner_id: user_id }),
                correlation_id,
                clock,
            );
        }
        Ok(())
    }

    /// Moves `target_id` from the viewers to the banned users.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ActionNotAllowed` unless the initiator is the
    /// owner (and the target is someone else), and
    /// `DomainError::ViewerNotFound` if the target is not a viewer.
    pub fn kick(
        &mut self,
        initiator_id: Uuid,
        target_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        if initiator_id != self.owner_id {
            return Err(DomainError::ActionNotAllowed(
                "only the room owner can kick viewers".to_owned(),
            ));
        }
        if target_id == self.owner_id {
            return Err(DomainError::ActionNotAllowed(
                "the room owner cannot kick themselves".to_owned(),
            ));
        }
        if self.viewers.remove(&target_id).is_none() {
            return Err(DomainError::ViewerNotFound(target_id));
        }

        self.banned_users.insert(target_id);
        self.touch(clock);
        self.record(
            RoomEventKind::ViewerKicked(ViewerKicked {
                initiator_id,
                target_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Accepts a chat message from a viewer.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if the room is closing, plus any
    /// error of [`Message::new`].
    pub fn send_message(
        &mut self,
        user_id: Uuid,
        text: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Message, DomainError> {
        self.ensure_active()?;
        let message = Message::new(self, user_id, text, clock)?;

        self.touch(clock);
        self.record(
            RoomEventKind::MessageSent(MessageSent {
                message_id: message.id,
                user_id,
                text: message.text.clone(),
                sent_at: message.sent_at,
            }),
            correlation_id,
            clock,
        );
        Ok(message)
    }

    /// Pauses or resumes playback at `position_ticks`.
    ///
    /// # Errors
    ///
    /// See [`Room::ensure_can_drive_playback`]; also
    /// `DomainError::Validation` for a negative position.
    pub fn set_pause(
        &mut self,
        initiator_id: Uuid,
        paused: bool,
        position_ticks: i64,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_can_drive_playback(initiator_id)?;
        validate_position(position_ticks)?;

        self.playback.paused = paused;
        self.playback.position_ticks = position_ticks;
        self.touch(clock);
        self.record(
            RoomEventKind::PauseChanged(PauseChanged {
                initiator_id,
                paused,
                position_ticks,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Seeks to `position_ticks`.
    ///
    /// # Errors
    ///
    /// See [`Room::ensure_can_drive_playback`]; also
    /// `DomainError::Validation` for a negative position.
    pub fn set_time_line(
        &mut self,
        initiator_id: Uuid,
        position_ticks: i64,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_can_drive_playback(initiator_id)?;
        validate_position(position_ticks)?;

        self.playback.position_ticks = position_ticks;
        self.touch(clock);
        self.record(
            RoomEventKind::TimeLineChanged(TimeLineChanged {
                initiator_id,
                position_ticks,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Switches to another episode and rewinds to its start.
    ///
    /// # Errors
    ///
    /// See [`Room::ensure_can_drive_playback`]; also
    /// `DomainError::Validation` for negative numbers.
    pub fn set_episode(
        &mut self,
        initiator_id: Uuid,
        season: i32,
        episode: i32,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_can_drive_playback(initiator_id)?;
        if season < 0 || episode < 0 {
            return Err(DomainError::Validation(
                "season and episode must not be negative".to_owned(),
            ));
        }

        self.playback.season = Some(season);
        self.playback.episode = Some(episode);
        self.playback.position_ticks = 0;
        self.touch(clock);
        self.record(
            RoomEventKind::EpisodeChanged(EpisodeChanged {
                initiator_id,
                season,
                episode,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Changes the playback rate.
    ///
    /// # Errors
    ///
    /// See [`Room::ensure_can_drive_playback`]; also
    /// `DomainError::Validation` unless the speed is finite and positive.
    pub fn set_speed(
        &mut self,
        initiator_id: Uuid,
        speed: f32,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_can_drive_playback(initiator_id)?;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(DomainError::Validation(format!(
                "playback speed must be positive, got {speed}"
            )));
        }

        self.playback.speed = speed;
        self.touch(clock);
        self.record(
            RoomEventKind::SpeedChanged(SpeedChanged {
                initiator_id,
                speed,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Sets the fullscreen flag.
    ///
    /// # Errors
    ///
    /// See [`Room::ensure_can_drive_playback`].
    pub fn set_fullscreen(
        &mut self,
        initiator_id: Uuid,
        fullscreen: bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_can_drive_playback(initiator_id)?;

        self.playback.fullscreen = fullscreen;
        self.touch(clock);
        self.record(
            RoomEventKind::FullscreenChanged(FullscreenChanged {
                initiator_id,
                fullscreen,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Records a beep aimed at `target_id`. Only the activity time changes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ActionNotAllowed` if the initiator is not a
    /// viewer and `DomainError::ViewerNotFound` if the target is not.
    pub fn beep(
        &mut self,
        initiator_id: Uuid,
        target_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_can_nudge(initiator_id, target_id)?;
        self.touch(clock);
        self.record(
            RoomEventKind::Beeped(ViewerNudged {
                initiator_id,
                target_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Records a scream aimed at `target_id`. Only the activity time changes.
    ///
    /// # Errors
    ///
    /// Same as [`Room::beep`].
    pub fn scream(
        &mut self,
        initiator_id: Uuid,
        target_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_can_nudge(initiator_id, target_id)?;
        self.touch(clock);
        self.record(
            RoomEventKind::Screamed(ViewerNudged {
                initiator_id,
                target_id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Checks that `user_id` may drive playback under the room's policy.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if the room is closing,
    /// `DomainError::ViewerNotFound` for non-viewers and
    /// `DomainError::ActionNotAllowed` when the policy reserves playback for
    /// the owner.
    pub fn ensure_can_drive_playback(&self, user_id: Uuid) -> Result<(), DomainError> {
        self.ensure_active()?;
        if !self.viewers.contains_key(&user_id) {
            return Err(DomainError::ViewerNotFound(user_id));
        }
        if self.playback_policy == PlaybackPolicy::OwnerOnly && user_id != self.owner_id {
            return Err(DomainError::ActionNotAllowed(
                "only the room owner can control playback".to_owned(),
            ));
        }
        Ok(())
    }

    fn ensure_can_nudge(&self, initiator_id: Uuid, target_id: Uuid) -> Result<(), DomainError> {
        self.ensure_active()?;
        if !self.viewers.contains_key(&initiator_id) {
            return Err(DomainError::ActionNotAllowed(
                "only viewers of the room can nudge others".to_owned(),
            ));
        }
        if !self.viewers.contains_key(&target_id) {
            return Err(DomainError::ViewerNotFound(target_id));
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        match self.state {
            RoomState::Active => Ok(()),
            RoomState::PendingDelete => Err(DomainError::RoomNotFound(self.id)),
        }
    }

    fn touch(&mut self, clock: &dyn Clock) {
        self.last_activity_at = clock.now();
    }

    fn record(&mut self, kind: RoomEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        self.event_sequence += 1;
        let event = RoomEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.event_sequence,
                correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.uncommitted_events.push(event);
    }
}

fn validate_position(position_ticks: i64) -> Result<(), DomainError> {
    if position_ticks < 0 {
        return Err(DomainError::Validation(format!(
            "position must not be negative, got {position_ticks}"
        )));
    }
    Ok(())
}

impl AggregateRoot for Room {
    type Event = RoomEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.uncommitted_events)
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::VIEWER_JOINED_EVENT_TYPE;
    use chrono::TimeZone;
    use cinesync_core::event::DomainEvent;
    use cinesync_test_support::FixedClock;

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            user_id: Uuid::new_v4(),
            name: name.to_owned(),
            photo_ref: None,
        }
    }

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn new_room(owner: &UserProfile, code: Option<&str>, settings: RoomSettings) -> Room {
        let mut room = Room::create(
            Uuid::new_v4(),
            owner,
            Uuid::new_v4(),
            code.map(str::to_owned),
            settings,
            Uuid::new_v4(),
            &fixed_clock(),
        )
        .unwrap();
        room.clear_uncommitted_events();
        room
    }

    #[test]
    fn test_create_adds_owner_as_offline_viewer() {
        // Arrange
        let owner = profile("Owen");
        let clock = fixed_clock();

        // Act
        let room = Room::create(
            Uuid::new_v4(),
            &owner,
            Uuid::new_v4(),
            None,
            RoomSettings::default(),
            Uuid::new_v4(),
            &clock,
        )
        .unwrap();

        // Assert
        let viewer = room.viewer(owner.user_id).unwrap();
        assert!(!viewer.online);
        assert_eq!(room.owner_id(), owner.user_id);
        assert_eq!(room.state(), RoomState::Active);
        assert_eq!(room.uncommitted_events().len(), 1);
        assert_eq!(room.uncommitted_events()[0].metadata().sequence_number, 1);
    }

    #[test]
    fn test_create_rejects_zero_capacity() {
        let settings = RoomSettings {
            capacity: 0,
            ..RoomSettings::default()
        };
        let result = Room::create(
            Uuid::new_v4(),
            &profile("Owen"),
            Uuid::new_v4(),
            None,
            settings,
            Uuid::new_v4(),
            &fixed_clock(),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_connect_new_viewer_produces_viewer_joined_event() {
        // Arrange
        let owner = profile("Owen");
        let guest = profile("Gail");
        let mut room = new_room(&owner, None, RoomSettings::default());
        let connection_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();

        // Act
        room.connect(&guest, None, connection_id, correlation_id, &fixed_clock())
            .unwrap();

        // Assert
        let events = room.uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), VIEWER_JOINED_EVENT_TYPE);
        assert_eq!(events[0].metadata().correlation_id, correlation_id);
        assert_eq!(events[0].metadata().sequence_number, 2);
        let viewer = room.viewer(guest.user_id).unwrap();
        assert!(viewer.online);
        assert_eq!(viewer.connection_id, Some(connection_id));
    }

    #[test]
    fn test_connect_banned_user_fails_and_leaves_viewers_unchanged() {
        // Arrange
        let owner = profile("Owen");
        let guest = profile("Gail");
        let clock = fixed_clock();
        let mut room = new_room(&owner, None, RoomSettings::default());
        room.connect(&guest, None, Uuid::new_v4(), Uuid::new_v4(), &clock)
            .unwrap();
        room.kick(owner.user_id, guest.user_id, Uuid::new_v4(), &clock)
            .unwrap();
        room.clear_uncommitted_events();

        // Act
        let result = room.connect(&guest, None, Uuid::new_v4(), Uuid::new_v4(), &clock);

        // Assert
        match result {
            Err(DomainError::UserBannedInRoom(id)) => assert_eq!(id, guest.user_id),
            other => panic!("expected UserBannedInRoom, got {other:?}"),
        }
        assert!(!room.is_viewer(guest.user_id));
        assert_eq!(room.viewers().len(), 1);
        assert!(room.uncommitted_events().is_empty());
    }

    #[test]
    fn test_connect_private_room_requires_matching_code_for_newcomers() {
        let owner = profile("Owen");
        let guest = profile("Gail");
        let clock = fixed_clock();
        let mut room = new_room(&owner, Some("ABC123"), RoomSettings::default());

        assert!(matches!(
            room.connect(&guest, None, Uuid::new_v4(), Uuid::new_v4(), &clock),
            Err(DomainError::InvalidCode)
        ));
        assert!(matches!(
            room.connect(&guest, Some("XYZ999"), Uuid::new_v4(), Uuid::new_v4(), &clock),
            Err(DomainError::InvalidCode)
        ));
        room.connect(&guest, Some("ABC123"), Uuid::new_v4(), Uuid::new_v4(), &clock)
            .unwrap();
        // Existing viewers reconnect without the code.
        room.connect(&owner, None, Uuid::new_v4(), Uuid::new_v4(), &clock)
            .unwrap();
    }

    #[test]
    fn test_connect_public_room_ignores_code() {
        let owner = profile("Owen");
        let mut room = new_room(&owner, None, RoomSettings::default());

        room.connect(
            &profile("Gail"),
            Some("whatever"),
            Uuid::new_v4(),
            Uuid::new_v4(),
            &fixed_clock(),
        )
        .unwrap();
    }

    #[test]
    fn test_connect_beyond_capacity_returns_room_is_full() {
        // Arrange
        let owner = profile("Owen");
        let clock = fixed_clock();
        let settings = RoomSettings {
            capacity: 3,
            ..RoomSettings::default()
        };
        let mut room = new_room(&owner, None, settings);
        for name in ["Ann", "Bob"] {
            room.connect(&profile(name), None, Uuid::new_v4(), Uuid::new_v4(), &clock)
                .unwrap();
        }

        // Act
        let result = room.connect(&profile("Cat"), None, Uuid::new_v4(), Uuid::new_v4(), &clock);

        // Assert
        match result {
            Err(DomainError::RoomIsFull { capacity, .. }) => assert_eq!(capacity, 3),
            other => panic!("expected RoomIsFull, got {other:?}"),
        }
        assert_eq!(room.viewers().len(), 3);
    }

    #[test]
    fn test_connect_online_viewer_swaps_connection_and_records_reconnect() {
        // Arrange
        let owner = profile("Owen");
        let clock = fixed_clock();
        let mut room = new_room(&owner, None, RoomSettings::default());
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        room.connect(&owner, None, first, Uuid::new_v4(), &clock)
            .unwrap();
        room.clear_uncommitted_events();

        // Act
        room.connect(&owner, None, second, Uuid::new_v4(), &clock)
            .unwrap();

        // Assert
        match &room.uncommitted_events()[0].kind {
            RoomEventKind::ViewerReconnected(payload) => {
                assert_eq!(payload.connection_id, second);
            }
            other => panic!("expected ViewerReconnected, got {other:?}"),
        }
        assert_eq!(room.viewer(owner.user_id).unwrap().connection_id, Some(second));
    }

    #[test]
    fn test_disconnect_ignores_stale_connection() {
        let owner = profile("Owen");
        let clock = fixed_clock();
        let mut room = new_room(&owner, None, RoomSettings::default());
        let stale = Uuid::new_v4();
        let current = Uuid::new_v4();
        room.connect(&owner, None, stale, Uuid::new_v4(), &clock)
            .unwrap();
        room.connect(&owner, None, current, Uuid::new_v4(), &clock)
            .unwrap();
        room.clear_uncommitted_events();

        assert!(
            !room
                .disconnect(owner.user_id, stale, Uuid::new_v4(), &clock)
                .unwrap()
        );
        assert!(room.viewer(owner.user_id).unwrap().online);
        assert!(room.uncommitted_events().is_empty());

        assert!(
            room.disconnect(owner.user_id, current, Uuid::new_v4(), &clock)
                .unwrap()
        );
        assert!(!room.viewer(owner.user_id).unwrap().online);
    }

    #[test]
    fn test_kick_by_non_owner_is_not_allowed_and_mutates_nothing() {
        // Arrange
        let owner = profile("Owen");
        let guest = profile("Gail");
        let other = profile("Otto");
        let clock = fixed_clock();
        let mut room = new_room(&owner, None, RoomSettings::default());
        room.connect(&guest, None, Uuid::new_v4(), Uuid::new_v4(), &clock)
            .unwrap();
        room.connect(&other, None, Uuid::new_v4(), Uuid::new_v4(), &clock)
            .unwrap();
        room.clear_uncommitted_events();

        // Act
        let result = room.kick(guest.user_id, other.user_id, Uuid::new_v4(), &clock);

        // Assert
        assert!(matches!(result, Err(DomainError::ActionNotAllowed(_))));
        assert!(room.is_viewer(other.user_id));
        assert!(!room.is_banned(other.user_id));
        assert!(room.uncommitted_events().is_empty());
    }

    #[test]
    fn test_kick_moves_target_to_banned_users() {
        let owner = profile("Owen");
        let guest = profile("Gail");
        let clock = fixed_clock();
        let mut room = new_room(&owner, None, RoomSettings::default());
        room.connect(&guest, None, Uuid::new_v4(), Uuid::new_v4(), &clock)
            .unwrap();

        room.kick(owner.user_id, guest.user_id, Uuid::new_v4(), &clock)
            .unwrap();

        assert!(!room.is_viewer(guest.user_id));
        assert!(room.is_banned(guest.user_id));
        assert!(matches!(
            room.kick(owner.user_id, owner.user_id, Uuid::new_v4(), &clock),
            Err(DomainError::ActionNotAllowed(_))
        ));
        assert!(matches!(
            room.kick(owner.user_id, guest.user_id, Uuid::new_v4(), &clock),
            Err(DomainError::ViewerNotFound(_))
        ));
    }

    #[test]
    fn test_owner_leave_closes_room() {
        // Arrange
        let owner = profile("Owen");
        let guest = profile("Gail");
        let clock = fixed_clock();
        let mut room = new_room(&owner, None, RoomSettings::default());
        room.connect(&guest, None, Uuid::new_v4(), Uuid::new_v4(), &clock)
            .unwrap();
        room.clear_uncommitted_events();

        // Act
        room.leave(owner.user_id, Uuid::new_v4(), &clock).unwrap();

        // Assert
        assert_eq!(room.state(), RoomState::PendingDelete);
        let kinds: Vec<&str> = room
            .uncommitted_events()
            .iter()
            .map(DomainEvent::event_type)
            .collect();
        assert_eq!(kinds, vec!["room.viewer_left", "room.closed"]);
        assert!(matches!(
            room.send_message(guest.user_id, "hello?", Uuid::new_v4(), &clock),
            Err(DomainError::RoomNotFound(_))
        ));
    }

    #[test]
    fn test_leave_by_non_viewer_returns_viewer_not_found() {
        let owner = profile("Owen");
        let mut room = new_room(&owner, None, RoomSettings::default());
        let stranger = Uuid::new_v4();

        match room.leave(stranger, Uuid::new_v4(), &fixed_clock()) {
            Err(DomainError::ViewerNotFound(id)) => assert_eq!(id, stranger),
            other => panic!("expected ViewerNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_playback_is_owner_only_by_default() {
        let owner = profile("Owen");
        let guest = profile("Gail");
        let clock = fixed_clock();
        let mut room = new_room(&owner, None, RoomSettings::default());
        room.connect(&guest, None, Uuid::new_v4(), Uuid::new_v4(), &clock)
            .unwrap();

        assert!(matches!(
            room.set_pause(guest.user_id, false, 100, Uuid::new_v4(), &clock),
            Err(DomainError::ActionNotAllowed(_))
        ));
        assert!(matches!(
            room.set_pause(Uuid::new_v4(), false, 100, Uuid::new_v4(), &clock),
            Err(DomainError::ViewerNotFound(_))
        ));
        room.set_pause(owner.user_id, false, 100, Uuid::new_v4(), &clock)
            .unwrap();
        assert!(!room.playback().paused);
        assert_eq!(room.playback().position_ticks, 100);
    }

    #[test]
    fn test_any_viewer_policy_lets_guests_drive_playback() {
        let owner = profile("Owen");
        let guest = profile("Gail");
        let clock = fixed_clock();
        let settings = RoomSettings {
            playback_policy: PlaybackPolicy::AnyViewer,
            ..RoomSettings::default()
        };
        let mut room = new_room(&owner, None, settings);
        room.connect(&guest, None, Uuid::new_v4(), Uuid::new_v4(), &clock)
            .unwrap();

        room.set_time_line(guest.user_id, 42, Uuid::new_v4(), &clock)
            .unwrap();
        room.set_speed(guest.user_id, 1.5, Uuid::new_v4(), &clock)
            .unwrap();
        room.set_fullscreen(guest.user_id, true, Uuid::new_v4(), &clock)
            .unwrap();

        let playback = room.playback();
        assert_eq!(playback.position_ticks, 42);
        assert!((playback.speed - 1.5).abs() < f32::EPSILON);
        assert!(playback.fullscreen);
    }

    #[test]
    fn test_set_episode_rewinds_position() {
        let owner = profile("Owen");
        let clock = fixed_clock();
        let mut room = new_room(&owner, None, RoomSettings::default());
        room.set_time_line(owner.user_id, 9_000, Uuid::new_v4(), &clock)
            .unwrap();

        room.set_episode(owner.user_id, 2, 5, Uuid::new_v4(), &clock)
            .unwrap();

        let playback = room.playback();
        assert_eq!(playback.season, Some(2));
        assert_eq!(playback.episode, Some(5));
        assert_eq!(playback.position_ticks, 0);
    }

    #[test]
    fn test_playback_rejects_invalid_values() {
        let owner = profile("Owen");
        let clock = fixed_clock();
        let mut room = new_room(&owner, None, RoomSettings::default());

        assert!(matches!(
            room.set_time_line(owner.user_id, -1, Uuid::new_v4(), &clock),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            room.set_speed(owner.user_id, 0.0, Uuid::new_v4(), &clock),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            room.set_speed(owner.user_id, f32::NAN, Uuid::new_v4(), &clock),
            Err(DomainError::Validation(_))
        ));
        assert!(room.uncommitted_events().is_empty());
    }

    #[test]
    fn test_beep_requires_both_parties_to_be_viewers() {
        let owner = profile("Owen");
        let guest = profile("Gail");
        let clock = fixed_clock();
        let mut room = new_room(&owner, None, RoomSettings::default());
        room.connect(&guest, None, Uuid::new_v4(), Uuid::new_v4(), &clock)
            .unwrap();
        room.clear_uncommitted_events();

        assert!(matches!(
            room.beep(Uuid::new_v4(), guest.user_id, Uuid::new_v4(), &clock),
            Err(DomainError::ActionNotAllowed(_))
        ));
        assert!(matches!(
            room.scream(guest.user_id, Uuid::new_v4(), Uuid::new_v4(), &clock),
            Err(DomainError::ViewerNotFound(_))
        ));
        room.beep(guest.user_id, owner.user_id, Uuid::new_v4(), &clock)
            .unwrap();
        assert_eq!(room.uncommitted_events().len(), 1);
    }

    #[test]
    fn test_beep_and_scream_advance_last_activity() {
        // Arrange
        let owner = profile("Owen");
        let guest = profile("Gail");
        let mut room = new_room(&owner, None, RoomSettings::default());
        room.connect(&guest, None, Uuid::new_v4(), Uuid::new_v4(), &fixed_clock())
            .unwrap();
        let later = FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 5, 0).unwrap());
        let latest = FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 9, 0).unwrap());

        // Act
        room.beep(guest.user_id, owner.user_id, Uuid::new_v4(), &later)
            .unwrap();
        let after_beep = room.last_activity_at();
        room.scream(owner.user_id, guest.user_id, Uuid::new_v4(), &latest)
            .unwrap();

        // Assert
        assert_eq!(after_beep, later.0);
        assert_eq!(room.last_activity_at(), latest.0);
    }

    #[test]
    fn test_snapshot_round_trip_preserves_state() {
        let owner = profile("Owen");
        let guest = profile("Gail");
        let clock = fixed_clock();
        let mut room = new_room(&owner, Some("ABC123"), RoomSettings::default());
        room.connect(&guest, Some("ABC123"), Uuid::new_v4(), Uuid::new_v4(), &clock)
            .unwrap();
        room.set_pause(owner.user_id, false, 77, Uuid::new_v4(), &clock)
            .unwrap();

        let snapshot = room.to_snapshot(3);
        let restored = Room::from_snapshot(snapshot.clone(), PlaybackPolicy::OwnerOnly).unwrap();

        assert_eq!(restored.version(), 3);
        assert_eq!(restored.to_snapshot(3), snapshot);
        assert!(restored.uncommitted_events().is_empty());
    }

    #[test]
    fn test_from_snapshot_rejects_banned_viewer() {
        let owner = profile("Owen");
        let room = new_room(&owner, None, RoomSettings::default());
        let mut snapshot = room.to_snapshot(1);
        snapshot.banned_users.push(owner.user_id);

        assert!(matches!(
            Room::from_snapshot(snapshot, PlaybackPolicy::OwnerOnly),
            Err(DomainError::Infrastructure(_))
        ));
    }
}
