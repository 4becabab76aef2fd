// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Room related API request and response bodies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    permissions::PermissionSet,
    rooms::{
        AnonymousAccess, AutoDeletionPolicy, MeetingEndAction, RoomConfig, RoomDeletionCode,
        RoomId, RoomRole, RoomStatus, WithMeetingPolicy, WithRecordingsPolicy,
    },
};

/// Body of `POST /rooms`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostRoomsRequestBody {
    /// Human readable room name, also used as the room id prefix.
    #[validate(length(min = 1, max = 100))]
    pub room_name: String,
    /// Optional auto deletion date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_deletion_date: Option<DateTime<Utc>>,
    /// Policy applied when the auto deletion date is reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_deletion_policy: Option<AutoDeletionPolicy>,
    /// Initial feature toggles; defaults apply when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RoomConfig>,
    /// Anonymous access toggles per role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<BTreeMap<RoomRole, AnonymousRoleToggle>>,
}

/// Per-role anonymous access toggle used in requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousRoleToggle {
    /// Whether anonymous access with this role is enabled.
    pub enabled: bool,
}

/// Query of `GET /rooms`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetRoomsQuery {
    /// Maximum number of items to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 100))]
    pub max_items: Option<u32>,
    /// Cursor of the page to fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    /// Comma separated list of top-level fields to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
    /// Comma separated list of subtrees to expand (`config`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<String>,
    /// Filter by room name substring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
}

/// Query of `GET /rooms/{roomId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRoomQuery {
    /// Comma separated list of top-level fields to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
    /// Comma separated list of subtrees to expand (`config`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<String>,
}

/// Query of `DELETE /rooms/{roomId}`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRoomQuery {
    /// Behaviour towards an active meeting.
    #[serde(default)]
    pub with_meeting: WithMeetingPolicy,
    /// Behaviour towards existing recordings.
    #[serde(default)]
    pub with_recordings: WithRecordingsPolicy,
}

/// Query of `DELETE /rooms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRoomsQuery {
    /// Comma separated list of room ids.
    pub room_ids: String,
    /// Behaviour towards active meetings.
    #[serde(default)]
    pub with_meeting: WithMeetingPolicy,
    /// Behaviour towards existing recordings.
    #[serde(default)]
    pub with_recordings: WithRecordingsPolicy,
}

/// Body of `PUT /rooms/{roomId}/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRoomStatusRequestBody {
    /// The target status; only `open` and `closed` are accepted.
    pub status: RoomStatus,
}

/// Body of `PUT /rooms/{roomId}/roles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRoomRolesRequestBody {
    /// The complete new role templates.
    pub roles: BTreeMap<RoomRole, PermissionSet>,
}

/// Body of `PUT /rooms/{roomId}/anonymous`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRoomAnonymousRequestBody {
    /// Per-role anonymous access toggles.
    pub roles: BTreeMap<RoomRole, AnonymousRoleToggle>,
}

/// The `config` subtree of a [`RoomResource`], either inlined or collapsed
/// into an expandable stub.
///
/// The stub variant comes first: untagged deserialization tries variants
/// in order, and a stub body would otherwise parse as an all-default
/// config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpandableConfig {
    /// A stub pointing at the expanded representation.
    Stub(ExpandableStub),
    /// The inlined configuration.
    Expanded(RoomConfig),
}

/// Stub returned for collapsed subtrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandableStub {
    /// Always `true`.
    #[serde(rename = "_expandable")]
    pub expandable: bool,
    /// Where to fetch the expanded representation.
    #[serde(rename = "_href")]
    pub href: String,
}

/// Serialized view of a room, shaped by field filtering, expansion and the
/// requester's permissions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResource {
    /// Unique room identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    /// Human readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    /// Creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,
    /// Auto deletion date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_deletion_date: Option<DateTime<Utc>>,
    /// Auto deletion policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_deletion_policy: Option<AutoDeletionPolicy>,
    /// Feature toggles, inlined or stubbed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ExpandableConfig>,
    /// Role permission templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<BTreeMap<RoomRole, PermissionSet>>,
    /// Anonymous access configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<AnonymousAccess>,
    /// Lifecycle status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RoomStatus>,
    /// Deferred meeting end action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_end_action: Option<MeetingEndAction>,
    /// Permissions epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions_updated_at: Option<DateTime<Utc>>,
}

/// Body of `GET /rooms` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRoomsResponseBody {
    /// One page of rooms.
    pub rooms: Vec<RoomResource>,
    /// Cursor of the next page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Body of room deletion responses (200/202/409).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDeletionResponseBody {
    /// Outcome code from the deletion policy engine.
    pub code: RoomDeletionCode,
    /// Human readable outcome description.
    pub message: String,
    /// The surviving room, present when the outcome keeps it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomResource>,
}

/// A failed entry of a bulk room deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRoomDeletion {
    /// The room id as supplied by the client.
    pub room_id: String,
    /// Machine readable error code.
    pub error: String,
    /// Human readable error message.
    pub message: String,
}

/// Body of `DELETE /rooms` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRoomsResponseBody {
    /// Rooms that were deleted (or closed/scheduled) successfully.
    pub successful: Vec<RoomId>,
    /// Rooms that could not be processed.
    pub failed: Vec<FailedRoomDeletion>,
}
