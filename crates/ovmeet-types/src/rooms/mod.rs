// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Room domain model: identity, configuration, roles and lifecycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use url::Url;

use crate::permissions::PermissionSet;

/// Error returned when parsing an invalid [`RoomId`].
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("invalid room id: must be non-empty and contain only [a-z0-9_-]"))]
pub struct InvalidRoomId;

/// Unique, URL-safe room identifier (`{prefix}-{random}`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Parse a room id, validating URL safety.
    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidRoomId> {
        let value = value.into();

        if value.is_empty()
            || !value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(InvalidRoomId);
        }

        Ok(Self(value))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = InvalidRoomId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

impl std::str::FromStr for RoomId {
    type Err = InvalidRoomId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoomStatus {
    /// The room exists and can be joined.
    Open,
    /// A meeting is currently running in the room.
    ActiveMeeting,
    /// The room is closed; joining is rejected until it is reopened.
    Closed,
}

/// Action to perform when the current meeting of a room ends.
///
/// Set by deferred deletion/closure requests and consumed exactly once when
/// the media server reports the room as finished.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MeetingEndAction {
    /// Return the room to [`RoomStatus::Open`].
    #[default]
    None,
    /// Close the room.
    Close,
    /// Delete the room (cascading per the deferred deletion policy).
    Delete,
}

/// Policy applied when `auto_deletion_date` is reached, in the shape of a
/// deferred delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoDeletionPolicy {
    /// How to treat an active meeting at auto-deletion time.
    pub with_meeting: WithMeetingPolicy,
    /// How to treat existing recordings at auto-deletion time.
    pub with_recordings: WithRecordingsPolicy,
}

impl Default for AutoDeletionPolicy {
    /// Unset policies refuse deletion explicitly.
    fn default() -> Self {
        Self {
            with_meeting: WithMeetingPolicy::Fail,
            with_recordings: WithRecordingsPolicy::Fail,
        }
    }
}

/// Deletion behaviour towards an active meeting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithMeetingPolicy {
    /// End the meeting and proceed.
    Force,
    /// Defer the action until the meeting ends.
    WhenMeetingEnds,
    /// Refuse with a conflict.
    #[default]
    Fail,
}

/// Deletion behaviour towards existing recordings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithRecordingsPolicy {
    /// Delete the recordings along with the room.
    Force,
    /// Keep the recordings and close the room instead of deleting it.
    Close,
    /// Refuse with a conflict.
    #[default]
    Fail,
}

/// Role names used for room role templates and members.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::AsRefStr,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoomRole {
    /// Full meeting control.
    Moderator,
    /// Active participation.
    Speaker,
    /// Watch/listen only.
    Viewer,
}

/// Feature toggles of a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomConfig {
    /// Chat feature toggle.
    pub chat: FeatureToggle,
    /// Recording feature configuration.
    pub recording: RecordingConfig,
    /// Virtual background feature toggle.
    pub virtual_backgrounds: FeatureToggle,
}

/// A simple enabled/disabled toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureToggle {
    /// Whether the feature is enabled.
    pub enabled: bool,
}

impl Default for FeatureToggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Recording feature configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingConfig {
    /// Whether recordings can be started in the room.
    pub enabled: bool,
    /// Which members may access finished recordings.
    pub allow_access_to: RecordingAccess,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_access_to: RecordingAccess::AdminModerator,
        }
    }
}

/// Access levels for finished recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingAccess {
    /// Administrators only.
    Admin,
    /// Administrators and moderators.
    AdminModerator,
    /// Administrators, moderators and speakers.
    AdminModeratorSpeaker,
}

/// Anonymous access entry for a single role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousRoleAccess {
    /// Whether anonymous access with this role is enabled.
    pub enabled: bool,
    /// Opaque secret embedded in the access URL.
    pub secret: String,
    /// Shareable access URL (`{base_url}/{room_id}?secret={secret}`).
    pub access_url: Url,
    /// Epoch for tokens minted through this entry.
    pub permissions_updated_at: DateTime<Utc>,
}

/// Anonymous access configuration of a room, keyed by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnonymousAccess {
    /// Per-role anonymous access entries.
    pub roles: BTreeMap<RoomRole, AnonymousRoleAccess>,
}

impl AnonymousAccess {
    /// Resolve a secret to the single role it grants, if any.
    ///
    /// Secrets are generated per role and never shared, so a secret resolves
    /// to at most one role.
    pub fn resolve_secret(&self, secret: &str) -> Option<RoomRole> {
        self.roles
            .iter()
            .find(|(_, access)| access.enabled && access.secret == secret)
            .map(|(role, _)| *role)
    }
}

/// A logical meeting space owning configuration, roles, members and a
/// lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Unique, URL-safe identifier.
    pub room_id: RoomId,
    /// Human readable name.
    pub room_name: String,
    /// Creation timestamp.
    pub creation_date: DateTime<Utc>,
    /// Optional date after which the room is garbage collected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_deletion_date: Option<DateTime<Utc>>,
    /// Policy applied when `auto_deletion_date` is reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_deletion_policy: Option<AutoDeletionPolicy>,
    /// Feature toggles.
    pub config: RoomConfig,
    /// Per-role permission templates.
    pub roles: BTreeMap<RoomRole, PermissionSet>,
    /// Anonymous access configuration.
    pub anonymous: AnonymousAccess,
    /// Lifecycle status.
    pub status: RoomStatus,
    /// Deferred action consumed when the current meeting ends.
    pub meeting_end_action: MeetingEndAction,
    /// Monotonically non-decreasing permissions epoch.
    pub permissions_updated_at: DateTime<Utc>,
}

impl Room {
    /// Whether a meeting is currently running in the room.
    pub fn has_active_meeting(&self) -> bool {
        self.status == RoomStatus::ActiveMeeting
    }

    /// The permission template for `role`, falling back to no permissions.
    pub fn role_template(&self, role: RoomRole) -> PermissionSet {
        self.roles.get(&role).copied().unwrap_or(PermissionSet::NONE)
    }
}

/// Success and error codes of the room deletion policy engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomDeletionCode {
    /// Room deleted.
    RoomDeleted,
    /// Room and its recordings deleted.
    RoomAndRecordingsDeleted,
    /// Room closed instead of deleted, recordings kept.
    RoomClosed,
    /// Refused: the room has recordings.
    RoomHasRecordings,
    /// Room with a running meeting force-deleted.
    RoomWithActiveMeetingDeleted,
    /// Deletion deferred until the meeting ends.
    RoomScheduledToBeDeleted,
    /// Refused: the room has an active meeting.
    RoomHasActiveMeeting,
    /// Room with a running meeting and its recordings force-deleted.
    RoomWithActiveMeetingAndRecordingsDeleted,
    /// Meeting kicked, room closed, recordings kept.
    RoomWithActiveMeetingClosed,
    /// Refused: active meeting was force-handled but recordings block deletion.
    RoomWithActiveMeetingHasRecordings,
    /// Deletion of room and recordings deferred until the meeting ends.
    RoomAndRecordingsScheduledToBeDeleted,
    /// Closure deferred until the meeting ends.
    RoomScheduledToBeClosed,
    /// Refused: recordings prevent scheduling the deferred deletion.
    RoomHasRecordingsCannotScheduleDeletion,
    /// Refused: the room has recordings and an active meeting.
    RoomWithRecordingsHasActiveMeeting,
}

impl RoomDeletionCode {
    /// Whether the code describes a successful (2xx) outcome.
    pub fn is_success(self) -> bool {
        !matches!(
            self,
            Self::RoomHasRecordings
                | Self::RoomHasActiveMeeting
                | Self::RoomWithActiveMeetingHasRecordings
                | Self::RoomHasRecordingsCannotScheduleDeletion
                | Self::RoomWithRecordingsHasActiveMeeting
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn room_id_rejects_unsafe_characters() {
        assert!(RoomId::parse("demo-1234").is_ok());
        assert!(RoomId::parse("a_b-c9").is_ok());
        assert_eq!(RoomId::parse(""), Err(InvalidRoomId));
        assert_eq!(RoomId::parse("Demo"), Err(InvalidRoomId));
        assert_eq!(RoomId::parse("demo/../etc"), Err(InvalidRoomId));
        assert_eq!(RoomId::parse("demo room"), Err(InvalidRoomId));
    }

    #[test]
    fn deletion_codes_serialize_screaming() {
        assert_eq!(
            serde_json::to_value(RoomDeletionCode::RoomWithActiveMeetingDeleted).unwrap(),
            serde_json::json!("ROOM_WITH_ACTIVE_MEETING_DELETED")
        );
        assert_eq!(RoomDeletionCode::RoomDeleted.as_ref(), "ROOM_DELETED");
    }

    #[test]
    fn secret_resolves_to_exactly_one_role() {
        let mut anonymous = AnonymousAccess::default();
        let entry = |secret: &str| AnonymousRoleAccess {
            enabled: true,
            secret: secret.into(),
            access_url: "https://meet.example.com/demo-1234?secret=s"
                .parse()
                .unwrap(),
            permissions_updated_at: Utc::now(),
        };
        let _ = anonymous.roles.insert(RoomRole::Speaker, entry("s-speaker"));
        let _ = anonymous.roles.insert(RoomRole::Viewer, entry("s-viewer"));

        assert_eq!(anonymous.resolve_secret("s-viewer"), Some(RoomRole::Viewer));
        assert_eq!(anonymous.resolve_secret("s-speaker"), Some(RoomRole::Speaker));
        assert_eq!(anonymous.resolve_secret("nope"), None);
    }
}
