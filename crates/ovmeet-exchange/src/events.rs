// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use ovmeet_types::{
    members::MemberId,
    recordings::{RecordingId, RecordingStatus},
    rooms::RoomId,
};
use serde::{Deserialize, Serialize};

/// Event names events are published and subscribed under.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::AsRefStr,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Topic {
    MeetingStarted,
    MeetingEnded,
    RecordingActive,
    RecordingEnded,
    RoomDeleted,
    MemberPermissionsChanged,
    StorageReady,
}

impl Topic {
    /// All topics, used to subscribe the bus pump to the exchange.
    pub const ALL: [Topic; 7] = [
        Topic::MeetingStarted,
        Topic::MeetingEnded,
        Topic::RecordingActive,
        Topic::RecordingEnded,
        Topic::RoomDeleted,
        Topic::MemberPermissionsChanged,
        Topic::StorageReady,
    ];
}

/// A system event carried over the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum SystemEvent {
    /// A meeting started in the room.
    MeetingStarted { room_id: RoomId },
    /// The meeting in the room ended.
    MeetingEnded { room_id: RoomId },
    /// The media server confirmed a recording as active.
    RecordingActive {
        room_id: RoomId,
        recording_id: RecordingId,
    },
    /// A recording reached a terminal state.
    RecordingEnded {
        room_id: RoomId,
        recording_id: RecordingId,
        status: RecordingStatus,
    },
    /// A room was deleted.
    RoomDeleted { room_id: RoomId },
    /// A member's permissions changed; outstanding tokens are stale.
    MemberPermissionsChanged {
        room_id: RoomId,
        member_id: MemberId,
    },
    /// Storage seeding finished; replicas may start serving.
    StorageReady,
}

impl SystemEvent {
    /// The topic this event is routed under.
    pub fn topic(&self) -> Topic {
        match self {
            Self::MeetingStarted { .. } => Topic::MeetingStarted,
            Self::MeetingEnded { .. } => Topic::MeetingEnded,
            Self::RecordingActive { .. } => Topic::RecordingActive,
            Self::RecordingEnded { .. } => Topic::RecordingEnded,
            Self::RoomDeleted { .. } => Topic::RoomDeleted,
            Self::MemberPermissionsChanged { .. } => Topic::MemberPermissionsChanged,
            Self::StorageReady => Topic::StorageReady,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn events_route_under_their_topic() {
        let event = SystemEvent::RecordingActive {
            room_id: RoomId::parse("demo-1234").unwrap(),
            recording_id: RecordingId::parse("demo-1234--eg1--u1").unwrap(),
        };

        assert_eq!(event.topic(), Topic::RecordingActive);
        assert_eq!(event.topic().to_string(), "recording_active");
    }

    #[test]
    fn events_round_trip_as_json() {
        let event = SystemEvent::MeetingEnded {
            room_id: RoomId::parse("demo-1234").unwrap(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let parsed: SystemEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, event);
    }
}
