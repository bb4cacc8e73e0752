//! JSON envelope codec.
//!
//! Encoding and decoding both switch explicitly over the closed set of
//! kinds. A kind name missing from the switch is rejected with
//! [`CodecError::UnknownKind`] instead of being skipped.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::commands::{ClientCommand, names};
use crate::events::{NotificationEvent, kinds};

/// Failures while encoding or decoding an envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The frame is not JSON or not a single-key envelope.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// The envelope key names no known event kind.
    #[error("unknown event kind: {0}")]
    UnknownKind(String),

    /// The envelope key names no known command.
    #[error("unknown command kind: {0}")]
    UnknownCommand(String),

    /// The payload does not match the kind's fields.
    #[error("invalid payload for {kind}: {source}")]
    InvalidPayload {
        /// The envelope key.
        kind: String,
        /// The underlying deserialization failure.
        #[source]
        source: serde_json::Error,
    },

    /// A payload could not be serialized.
    #[error("failed to encode {kind}: {source}")]
    Encode {
        /// The envelope key.
        kind: &'static str,
        /// The underlying serialization failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Encode a notification event as its JSON envelope.
///
/// # Errors
///
/// Returns `CodecError::Encode` if the payload cannot be serialized.
pub fn encode_event(event: &NotificationEvent) -> Result<String, CodecError> {
    let kind = event.kind();
    let payload = match event {
        NotificationEvent::Join(p) => payload_value(kind, p),
        NotificationEvent::Leave(p) => payload_value(kind, p),
        NotificationEvent::Kick(p) => payload_value(kind, p),
        NotificationEvent::Beep(p) => payload_value(kind, p),
        NotificationEvent::Scream(p) => payload_value(kind, p),
        NotificationEvent::Delete(p) => payload_value(kind, p),
        NotificationEvent::Error(p) => payload_value(kind, p),
        NotificationEvent::Presence(p) => payload_value(kind, p),
        NotificationEvent::Message(p) => payload_value(kind, p),
        NotificationEvent::Pause(p) => payload_value(kind, p),
        NotificationEvent::TimeLine(p) => payload_value(kind, p),
        NotificationEvent::Episode(p) => payload_value(kind, p),
        NotificationEvent::Speed(p) => payload_value(kind, p),
        NotificationEvent::Fullscreen(p) => payload_value(kind, p),
        NotificationEvent::Sync(p) => payload_value(kind, p),
    }?;
    Ok(envelope(kind, payload).to_string())
}

/// Decode a notification event from its JSON envelope.
///
/// # Errors
///
/// Returns `CodecError::Malformed` for non-envelope input,
/// `CodecError::UnknownKind` for an unrecognized key, and
/// `CodecError::InvalidPayload` when the fields do not match the kind.
pub fn decode_event(raw: &str) -> Result<NotificationEvent, CodecError> {
    let (kind, payload) = split_envelope(raw)?;
    let event = match kind.as_str() {
        kinds::JOIN => NotificationEvent::Join(payload_as(&kind, payload)?),
        kinds::LEAVE => NotificationEvent::Leave(payload_as(&kind, payload)?),
        kinds::KICK => NotificationEvent::Kick(payload_as(&kind, payload)?),
        kinds::BEEP => NotificationEvent::Beep(payload_as(&kind, payload)?),
        kinds::SCREAM => NotificationEvent::Scream(payload_as(&kind, payload)?),
        kinds::DELETE => NotificationEvent::Delete(payload_as(&kind, payload)?),
        kinds::ERROR => NotificationEvent::Error(payload_as(&kind, payload)?),
        kinds::PRESENCE => NotificationEvent::Presence(payload_as(&kind, payload)?),
        kinds::MESSAGE => NotificationEvent::Message(payload_as(&kind, payload)?),
        kinds::PAUSE => NotificationEvent::Pause(payload_as(&kind, payload)?),
        kinds::TIME_LINE => NotificationEvent::TimeLine(payload_as(&kind, payload)?),
        kinds::EPISODE => NotificationEvent::Episode(payload_as(&kind, payload)?),
        kinds::SPEED => NotificationEvent::Speed(payload_as(&kind, payload)?),
        kinds::FULLSCREEN => NotificationEvent::Fullscreen(payload_as(&kind, payload)?),
        kinds::SYNC => NotificationEvent::Sync(payload_as(&kind, payload)?),
        _ => return Err(CodecError::UnknownKind(kind)),
    };
    Ok(event)
}

/// Encode a client command as its JSON envelope. Field-less commands encode
/// with an empty object payload.
///
/// # Errors
///
/// Returns `CodecError::Encode` if the payload cannot be serialized.
pub fn encode_command(command: &ClientCommand) -> Result<String, CodecError> {
    let name = command.name();
    let payload = match command {
        ClientCommand::Connect(args) => payload_value(name, args),
        ClientCommand::SendMessage(args) => payload_value(name, args),
        ClientCommand::SetPause(args) => payload_value(name, args),
        ClientCommand::SetTimeLine(args) => payload_value(name, args),
        ClientCommand::SetEpisode(args) => payload_value(name, args),
        ClientCommand::SetSpeed(args) => payload_value(name, args),
        ClientCommand::SetFullscreen(args) => payload_value(name, args),
        ClientCommand::Beep(args) | ClientCommand::Scream(args) | ClientCommand::Kick(args) => {
            payload_value(name, args)
        }
        ClientCommand::Leave | ClientCommand::Sync => Ok(Value::Object(Map::new())),
    }?;
    Ok(envelope(name, payload).to_string())
}

/// Decode a client command. Field-less commands may arrive as a bare string.
///
/// # Errors
///
/// Returns `CodecError::Malformed` for non-envelope input,
/// `CodecError::UnknownCommand` for an unrecognized key, and
/// `CodecError::InvalidPayload` when the arguments do not match.
pub fn decode_command(raw: &str) -> Result<ClientCommand, CodecError> {
    let (name, payload) = split_envelope(raw)?;
    let command = match name.as_str() {
        names::CONNECT => ClientCommand::Connect(payload_as(&name, payload)?),
        names::LEAVE => ClientCommand::Leave,
        names::SEND_MESSAGE => ClientCommand::SendMessage(payload_as(&name, payload)?),
        names::SET_PAUSE => ClientCommand::SetPause(payload_as(&name, payload)?),
        names::SET_TIME_LINE => ClientCommand::SetTimeLine(payload_as(&name, payload)?),
        names::SET_EPISODE => ClientCommand::SetEpisode(payload_as(&name, payload)?),
        names::SET_SPEED => ClientCommand::SetSpeed(payload_as(&name, payload)?),
        names::SET_FULLSCREEN => ClientCommand::SetFullscreen(payload_as(&name, payload)?),
        names::BEEP => ClientCommand::Beep(payload_as(&name, payload)?),
        names::SCREAM => ClientCommand::Scream(payload_as(&name, payload)?),
        names::KICK => ClientCommand::Kick(payload_as(&name, payload)?),
        names::SYNC => ClientCommand::Sync,
        _ => return Err(CodecError::UnknownCommand(name)),
    };
    Ok(command)
}

fn envelope(kind: &str, payload: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(kind.to_owned(), payload);
    Value::Object(map)
}

fn split_envelope(raw: &str) -> Result<(String, Value), CodecError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| CodecError::Malformed(e.to_string()))?;
    match value {
        Value::String(kind) => Ok((kind, Value::Null)),
        Value::Object(map) if map.len() == 1 => map
            .into_iter()
            .next()
            .ok_or_else(|| CodecError::Malformed("empty envelope".to_owned())),
        Value::Object(map) => Err(CodecError::Malformed(format!(
            "expected exactly one kind key, found {}",
            map.len()
        ))),
        other => Err(CodecError::Malformed(format!(
            "expected an object envelope, found {other}"
        ))),
    }
}

fn payload_value<T: Serialize>(kind: &'static str, payload: &T) -> Result<Value, CodecError> {
    serde_json::to_value(payload).map_err(|source| CodecError::Encode { kind, source })
}

fn payload_as<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, CodecError> {
    serde_json::from_value(payload).map_err(|source| CodecError::InvalidPayload {
        kind: kind.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::commands::{ConnectArgs, SetPauseArgs, TargetArgs};
    use crate::events::{
        BeepNotification, ChatMessagePayload, DeleteNotification, EpisodeNotification,
        ErrorNotification, FullscreenNotification, JoinNotification, KickNotification,
        LeaveNotification, MessageNotification, PauseNotification, PlaybackPayload,
        PresenceNotification, RoomStatePayload, ScreamNotification, SpeedNotification,
        SyncNotification, TimeLineNotification, ViewerPayload,
    };

    fn every_event() -> Vec<NotificationEvent> {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let sent_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        vec![
            NotificationEvent::Join(JoinNotification {
                initiator: a,
                name: "Vera".into(),
                photo_ref: Some("avatars/vera.png".into()),
            }),
            NotificationEvent::Leave(LeaveNotification { initiator: a }),
            NotificationEvent::Kick(KickNotification {
                initiator: a,
                target: b,
            }),
            NotificationEvent::Beep(BeepNotification {
                initiator: a,
                target: b,
            }),
            NotificationEvent::Scream(ScreamNotification {
                initiator: a,
                target: b,
            }),
            NotificationEvent::Delete(DeleteNotification {
                initiator: a,
                room_id: b,
            }),
            NotificationEvent::Error(ErrorNotification {
                initiator: a,
                code: "room_not_found".into(),
                message: "room not found".into(),
            }),
            NotificationEvent::Presence(PresenceNotification {
                initiator: a,
                online: false,
            }),
            NotificationEvent::Message(MessageNotification {
                initiator: a,
                message_id: b,
                text: "hi".into(),
                sent_at,
            }),
            NotificationEvent::Pause(PauseNotification {
                initiator: a,
                paused: true,
                position_ticks: 42,
            }),
            NotificationEvent::TimeLine(TimeLineNotification {
                initiator: a,
                position_ticks: 9_000_000,
            }),
            NotificationEvent::Episode(EpisodeNotification {
                initiator: a,
                season: 2,
                episode: 5,
            }),
            NotificationEvent::Speed(SpeedNotification {
                initiator: a,
                speed: 1.5,
            }),
            NotificationEvent::Fullscreen(FullscreenNotification {
                initiator: a,
                fullscreen: true,
            }),
            NotificationEvent::Sync(SyncNotification {
                initiator: a,
                state: RoomStatePayload {
                    room_id: b,
                    owner_id: a,
                    media_id: Uuid::new_v4(),
                    is_private: true,
                    capacity: 10,
                    viewers: vec![ViewerPayload {
                        user_id: a,
                        name: "Owen".into(),
                        photo_ref: None,
                        online: true,
                        is_owner: true,
                    }],
                    playback: PlaybackPayload {
                        paused: false,
                        position_ticks: 7,
                        season: None,
                        episode: None,
                        speed: 1.0,
                        fullscreen: false,
                    },
                    messages: vec![ChatMessagePayload {
                        message_id: Uuid::new_v4(),
                        user_id: a,
                        text: "welcome".into(),
                        sent_at,
                    }],
                },
            }),
        ]
    }

    #[test]
    fn test_every_event_kind_round_trips() {
        for event in every_event() {
            let encoded = encode_event(&event).unwrap();
            let decoded = decode_event(&encoded).unwrap();
            assert_eq!(decoded, event, "round trip failed for {}", event.kind());
        }
    }

    #[test]
    fn test_envelope_has_single_kind_key_and_camel_case_fields() {
        // Arrange
        let initiator = Uuid::new_v4();
        let event = NotificationEvent::Pause(PauseNotification {
            initiator,
            paused: true,
            position_ticks: 10,
        });

        // Act
        let encoded = encode_event(&event).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();

        // Assert
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        let payload = &object["PauseNotificationEvent"];
        assert_eq!(payload["positionTicks"], 10);
        assert_eq!(payload["paused"], true);
        assert_eq!(payload["initiator"], initiator.to_string());
    }

    #[test]
    fn test_decode_unknown_event_kind_fails_explicitly() {
        let raw = r#"{"RenamedNotificationEvent": {"initiator": "00000000-0000-0000-0000-000000000000"}}"#;

        match decode_event(raw) {
            Err(CodecError::UnknownKind(kind)) => assert_eq!(kind, "RenamedNotificationEvent"),
            other => panic!("expected UnknownKind, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_multi_key_envelope() {
        let raw = r#"{"LeaveNotificationEvent": {}, "JoinNotificationEvent": {}}"#;

        assert!(matches!(decode_event(raw), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_decode_reports_payload_mismatch() {
        let raw = r#"{"KickNotificationEvent": {"initiator": "not-a-uuid"}}"#;

        match decode_event(raw) {
            Err(CodecError::InvalidPayload { kind, .. }) => {
                assert_eq!(kind, "KickNotificationEvent");
            }
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_command_accepts_bare_string_for_fieldless_commands() {
        assert_eq!(decode_command(r#""Leave""#).unwrap(), ClientCommand::Leave);
        assert_eq!(decode_command(r#"{"Sync": {}}"#).unwrap(), ClientCommand::Sync);
    }

    #[test]
    fn test_decode_command_reads_camel_case_arguments() {
        let room_id = Uuid::new_v4();
        let raw = format!(r#"{{"Connect": {{"roomId": "{room_id}"}}}}"#);

        let command = decode_command(&raw).unwrap();

        assert_eq!(
            command,
            ClientCommand::Connect(ConnectArgs {
                room_id,
                code: None,
            })
        );
    }

    #[test]
    fn test_command_encoding_round_trips() {
        let commands = vec![
            ClientCommand::SetPause(SetPauseArgs {
                pause: true,
                position_ticks: 120,
            }),
            ClientCommand::Kick(TargetArgs {
                target_id: Uuid::new_v4(),
            }),
            ClientCommand::Leave,
        ];

        for command in commands {
            let encoded = encode_command(&command).unwrap();
            assert_eq!(decode_command(&encoded).unwrap(), command);
        }
    }

    #[test]
    fn test_decode_unknown_command_fails_explicitly() {
        match decode_command(r#"{"Teleport": {}}"#) {
            Err(CodecError::UnknownCommand(name)) => assert_eq!(name, "Teleport"),
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
    }
}
