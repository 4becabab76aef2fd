// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Permission model shared by role templates, member overrides and tokens.

use serde::{Deserialize, Serialize};

/// The fixed set of permissions a room member can hold.
///
/// A `PermissionSet` is always fully materialised. Partial permission
/// information is expressed with [`PermissionOverrides`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    /// Allows starting and stopping recordings.
    pub can_record: bool,
    /// Allows listing and streaming recordings of the room.
    pub can_retrieve_recordings: bool,
    /// Allows deleting recordings of the room.
    pub can_delete_recordings: bool,
    /// Allows sending chat messages.
    pub can_chat: bool,
    /// Allows changing the own virtual background.
    pub can_change_virtual_background: bool,
    /// Allows promoting other members to moderator.
    pub can_make_moderator: bool,
    /// Allows reading the room configuration subtree.
    pub can_see_room_config: bool,
}

impl PermissionSet {
    /// A permission set with every permission revoked.
    pub const NONE: Self = Self {
        can_record: false,
        can_retrieve_recordings: false,
        can_delete_recordings: false,
        can_chat: false,
        can_change_virtual_background: false,
        can_make_moderator: false,
        can_see_room_config: false,
    };

    /// Overlay `overrides` on top of this set, key by key.
    ///
    /// Keys that are `None` in the overrides inherit the template value.
    pub fn with_overrides(self, overrides: &PermissionOverrides) -> Self {
        Self {
            can_record: overrides.can_record.unwrap_or(self.can_record),
            can_retrieve_recordings: overrides
                .can_retrieve_recordings
                .unwrap_or(self.can_retrieve_recordings),
            can_delete_recordings: overrides
                .can_delete_recordings
                .unwrap_or(self.can_delete_recordings),
            can_chat: overrides.can_chat.unwrap_or(self.can_chat),
            can_change_virtual_background: overrides
                .can_change_virtual_background
                .unwrap_or(self.can_change_virtual_background),
            can_make_moderator: overrides.can_make_moderator.unwrap_or(self.can_make_moderator),
            can_see_room_config: overrides
                .can_see_room_config
                .unwrap_or(self.can_see_room_config),
        }
    }
}

/// A sparse permission overlay stored per member.
///
/// `None` keys inherit from the role template of the room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionOverrides {
    /// Override for [`PermissionSet::can_record`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_record: Option<bool>,
    /// Override for [`PermissionSet::can_retrieve_recordings`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_retrieve_recordings: Option<bool>,
    /// Override for [`PermissionSet::can_delete_recordings`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_delete_recordings: Option<bool>,
    /// Override for [`PermissionSet::can_chat`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_chat: Option<bool>,
    /// Override for [`PermissionSet::can_change_virtual_background`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_change_virtual_background: Option<bool>,
    /// Override for [`PermissionSet::can_make_moderator`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_make_moderator: Option<bool>,
    /// Override for [`PermissionSet::can_see_room_config`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_see_room_config: Option<bool>,
}

impl PermissionOverrides {
    /// Returns true when no key is overridden.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn overlay_inherits_undefined_keys() {
        let template = PermissionSet {
            can_record: true,
            can_retrieve_recordings: true,
            can_delete_recordings: false,
            can_chat: true,
            can_change_virtual_background: true,
            can_make_moderator: false,
            can_see_room_config: true,
        };

        let overrides = PermissionOverrides {
            can_record: Some(false),
            can_make_moderator: Some(true),
            ..Default::default()
        };

        let effective = template.with_overrides(&overrides);

        assert_eq!(
            effective,
            PermissionSet {
                can_record: false,
                can_make_moderator: true,
                ..template
            }
        );
    }

    #[test]
    fn empty_overlay_is_identity() {
        let template = PermissionSet::NONE;
        assert_eq!(template.with_overrides(&PermissionOverrides::default()), template);
    }
}
