// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! The permission engine.
//!
//! Pure resolution of effective permissions from the room's role template
//! and optional per-member overrides; no I/O happens here.

use ovmeet_types::{
    permissions::{PermissionOverrides, PermissionSet},
    rooms::{Room, RoomRole},
};

/// Resolve the effective permissions of `(room, role, overrides)`.
///
/// The room's template for `role` is overlaid key by key with the
/// overrides; undefined keys inherit the template value. The result is a
/// frozen snapshot, later changes to the room do not propagate into it.
pub fn resolve_effective_permissions(
    room: &Room,
    role: RoomRole,
    overrides: Option<&PermissionOverrides>,
) -> PermissionSet {
    let template = room.role_template(role);

    match overrides {
        Some(overrides) => template.with_overrides(overrides),
        None => template,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::test_room;

    #[test]
    fn overrides_win_over_the_template() {
        let room = test_room("demo-1");

        let overrides = PermissionOverrides {
            can_record: Some(true),
            can_chat: Some(false),
            ..Default::default()
        };

        let effective =
            resolve_effective_permissions(&room, RoomRole::Viewer, Some(&overrides));

        assert!(effective.can_record);
        assert!(!effective.can_chat);
        // Inherited from the viewer template
        assert!(!effective.can_make_moderator);
    }

    #[test]
    fn unknown_role_resolves_to_no_permissions() {
        let mut room = test_room("demo-1");
        let _ = room.roles.remove(&RoomRole::Viewer);

        assert_eq!(
            resolve_effective_permissions(&room, RoomRole::Viewer, None),
            PermissionSet::NONE
        );
    }
}
