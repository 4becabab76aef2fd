// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Global, persisted controller configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    permissions::PermissionSet,
    rooms::{RoomConfig, RoomRole},
};

/// Global configuration seeded at first startup and shared by all replicas.
///
/// New rooms copy their role templates and feature toggles from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    /// Default per-role permission templates for new rooms.
    pub default_roles: BTreeMap<RoomRole, PermissionSet>,
    /// Default feature toggles for new rooms.
    pub default_room_config: RoomConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let mut default_roles = BTreeMap::new();

        let _ = default_roles.insert(
            RoomRole::Moderator,
            PermissionSet {
                can_record: true,
                can_retrieve_recordings: true,
                can_delete_recordings: true,
                can_chat: true,
                can_change_virtual_background: true,
                can_make_moderator: true,
                can_see_room_config: true,
            },
        );
        let _ = default_roles.insert(
            RoomRole::Speaker,
            PermissionSet {
                can_record: false,
                can_retrieve_recordings: true,
                can_delete_recordings: false,
                can_chat: true,
                can_change_virtual_background: true,
                can_make_moderator: false,
                can_see_room_config: true,
            },
        );
        let _ = default_roles.insert(
            RoomRole::Viewer,
            PermissionSet {
                can_record: false,
                can_retrieve_recordings: false,
                can_delete_recordings: false,
                can_chat: true,
                can_change_virtual_background: false,
                can_make_moderator: false,
                can_see_room_config: false,
            },
        );

        Self {
            default_roles,
            default_room_config: RoomConfig::default(),
        }
    }
}
