// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use ovmeet_types::rooms::RoomId;

/// Typed builder for the fixed lock-name hierarchy.
///
/// Every lock name in the system is constructed through this type to keep
/// the namespace collision-free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockName {
    /// Guards the per-room recording critical section.
    RecordingActive(RoomId),
    /// Guards a single firing of a cluster-wide scheduled task.
    ScheduledTask(String),
    /// Guards the one-time storage seeding at startup.
    StorageInit,
    /// Guards data migrations.
    Migration,
    /// Deduplicates a single webhook delivery across replicas.
    Webhook { event: String, id: String },
    /// Guards a named registry entry.
    Registry(String),
}

impl LockName {
    /// Prefix shared by all [`LockName::RecordingActive`] locks.
    pub const RECORDING_ACTIVE_PREFIX: &'static str = "recording_active_";

    /// Extract the room id from a rendered `recording_active_{roomId}` name.
    pub fn recording_active_room(name: &str) -> Option<RoomId> {
        let room = name.strip_prefix(Self::RECORDING_ACTIVE_PREFIX)?;
        RoomId::parse(room).ok()
    }
}

impl std::fmt::Display for LockName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RecordingActive(room) => {
                write!(f, "{}{room}", Self::RECORDING_ACTIVE_PREFIX)
            }
            Self::ScheduledTask(name) => write!(f, "scheduled_task_{name}"),
            Self::StorageInit => f.write_str("storage_init"),
            Self::Migration => f.write_str("migration"),
            Self::Webhook { event, id } => write!(f, "webhook_{event}_{id}"),
            Self::Registry(name) => write!(f, "registry_{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn names_follow_the_fixed_hierarchy() {
        assert_eq!(
            LockName::RecordingActive(RoomId::parse("demo-1234").unwrap()).to_string(),
            "recording_active_demo-1234"
        );
        assert_eq!(
            LockName::ScheduledTask("room_expiration".into()).to_string(),
            "scheduled_task_room_expiration"
        );
        assert_eq!(LockName::StorageInit.to_string(), "storage_init");
        assert_eq!(LockName::Migration.to_string(), "migration");
        assert_eq!(
            LockName::Webhook {
                event: "egress_ended".into(),
                id: "EV_123".into()
            }
            .to_string(),
            "webhook_egress_ended_EV_123"
        );
        assert_eq!(
            LockName::Registry("exchange".into()).to_string(),
            "registry_exchange"
        );
    }

    #[test]
    fn recording_active_round_trip() {
        let room = RoomId::parse("demo-1234").unwrap();
        let name = LockName::RecordingActive(room.clone()).to_string();

        assert_eq!(LockName::recording_active_room(&name), Some(room));
        assert_eq!(LockName::recording_active_room("storage_init"), None);
    }
}
