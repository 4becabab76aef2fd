// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Room member domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    permissions::{PermissionOverrides, PermissionSet},
    rooms::{RoomId, RoomRole},
    users::UserId,
};

/// Prefix of identifiers generated for external members.
pub const EXTERNAL_MEMBER_PREFIX: &str = "ext-";

/// Identifier of a room member.
///
/// For registered users this equals the user id; for external members it is
/// a freshly generated identifier prefixed with [`EXTERNAL_MEMBER_PREFIX`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    /// Member id of a registered user.
    pub fn from_user(user_id: &UserId) -> Self {
        Self(user_id.as_str().to_owned())
    }

    /// Member id of an external member from a generated suffix.
    pub fn external(suffix: &str) -> Self {
        Self(format!("{EXTERNAL_MEMBER_PREFIX}{suffix}"))
    }

    /// Whether this member id belongs to an external member.
    pub fn is_external(&self) -> bool {
        self.0.starts_with(EXTERNAL_MEMBER_PREFIX)
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MemberId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A durable association between a principal and a room.
///
/// `(room_id, member_id)` is unique. `effective_permissions` is always the
/// materialised overlay of `custom_permissions` on top of the room's role
/// template at `permissions_updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    /// Member identifier.
    pub member_id: MemberId,
    /// The room this membership belongs to.
    pub room_id: RoomId,
    /// Display name.
    pub name: String,
    /// Role the permissions are derived from.
    pub base_role: RoomRole,
    /// Optional sparse permission overlay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_permissions: Option<PermissionOverrides>,
    /// Materialised permission snapshot.
    pub effective_permissions: PermissionSet,
    /// Epoch; bumping it invalidates previously minted member tokens.
    pub permissions_updated_at: DateTime<Utc>,
    /// Media-server participant identity while the member is joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_participant_identity: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn external_member_ids_are_prefixed() {
        let id = MemberId::external("a1b2c3");
        assert_eq!(id.as_str(), "ext-a1b2c3");
        assert!(id.is_external());

        let registered = MemberId::from_user(&UserId::from("alice".to_owned()));
        assert!(!registered.is_external());
    }
}
