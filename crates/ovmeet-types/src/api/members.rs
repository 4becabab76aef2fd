// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Room member related API request and response bodies.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    members::{MemberId, RoomMember},
    permissions::PermissionOverrides,
    rooms::RoomRole,
    users::UserId,
};

/// Body of `POST /rooms/{roomId}/members`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostMemberRequestBody {
    /// Id of the registered user to add; absent for external members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Display name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Role the permissions are derived from.
    pub base_role: RoomRole,
    /// Optional sparse permission overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_permissions: Option<PermissionOverrides>,
}

/// Body of `PATCH /rooms/{roomId}/members/{memberId}`.
///
/// Absent fields stay unchanged; an explicit empty overrides object clears
/// the member's custom permissions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PatchMemberRequestBody {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    /// New base role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_role: Option<RoomRole>,
    /// New permission overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_permissions: Option<PermissionOverrides>,
}

/// Query of `DELETE /rooms/{roomId}/members`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteMembersQuery {
    /// Comma separated list of member ids.
    pub member_ids: String,
}

/// A failed entry of a bulk member deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedMemberDeletion {
    /// The member id as supplied by the client.
    pub member_id: String,
    /// Machine readable error code.
    pub error: String,
}

/// Body of `DELETE /rooms/{roomId}/members` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteMembersResponseBody {
    /// Members that were deleted.
    pub deleted: Vec<MemberId>,
    /// Members that could not be deleted.
    pub failed: Vec<FailedMemberDeletion>,
}

/// Body of `GET /rooms/{roomId}/members` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMembersResponseBody {
    /// One page of members.
    pub members: Vec<RoomMember>,
    /// Cursor of the next page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Body of member token mint responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMemberTokenResponseBody {
    /// The signed room member token.
    pub token: String,
}
