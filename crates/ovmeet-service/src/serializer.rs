// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Permission-aware room serialisation with field filtering and expansion.

use std::collections::BTreeSet;

use ovmeet_types::{
    api::rooms::{ExpandableConfig, ExpandableStub, RoomResource},
    permissions::PermissionSet,
    rooms::Room,
};
use url::Url;

/// Who is looking at the room, and which slice of it they asked for.
#[derive(Debug, Clone)]
pub struct RoomView {
    /// Selected top-level fields; `None` selects everything.
    pub fields: Option<BTreeSet<String>>,
    /// Whether the `config` subtree is inlined instead of stubbed.
    pub expand_config: bool,
    /// Permissions of the requester; `None` means management access.
    pub permissions: Option<PermissionSet>,
}

impl RoomView {
    /// Management view: every field, collapsed config.
    pub fn management() -> Self {
        Self {
            fields: None,
            expand_config: false,
            permissions: None,
        }
    }

    /// Parse the `fields`/`expand` query parameters.
    pub fn from_query(
        fields: Option<&str>,
        expand: Option<&str>,
        permissions: Option<PermissionSet>,
    ) -> Self {
        let fields = fields.map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        });

        let expand_config = expand
            .map(|raw| raw.split(',').any(|part| part.trim() == "config"))
            .unwrap_or(false);

        Self {
            fields,
            expand_config,
            permissions,
        }
    }

    fn selects(&self, field: &str) -> bool {
        self.fields
            .as_ref()
            .map(|fields| fields.contains(field))
            .unwrap_or(true)
    }

    fn can_see_config(&self) -> bool {
        self.permissions
            .map(|permissions| permissions.can_see_room_config)
            .unwrap_or(true)
    }

    fn can_see_moderation(&self) -> bool {
        self.permissions
            .map(|permissions| permissions.can_make_moderator)
            .unwrap_or(true)
    }
}

/// Serialize a room for a requester.
///
/// Sensitive subtrees are partitioned by the permission gating them: the
/// `config` subtree needs `canSeeRoomConfig`, the `roles` templates and
/// the `anonymous` secrets need `canMakeModerator`. Fields the requester
/// lacks the gating permission for are stripped, not errored.
pub fn serialize_room(room: &Room, view: &RoomView, public_url: &Url) -> RoomResource {
    let mut resource = RoomResource::default();

    if view.selects("roomId") {
        resource.room_id = Some(room.room_id.clone());
    }
    if view.selects("roomName") {
        resource.room_name = Some(room.room_name.clone());
    }
    if view.selects("creationDate") {
        resource.creation_date = Some(room.creation_date);
    }
    if view.selects("autoDeletionDate") {
        resource.auto_deletion_date = room.auto_deletion_date;
    }
    if view.selects("autoDeletionPolicy") {
        resource.auto_deletion_policy = room.auto_deletion_policy;
    }
    if view.selects("status") {
        resource.status = Some(room.status);
    }
    if view.selects("meetingEndAction") {
        resource.meeting_end_action = Some(room.meeting_end_action);
    }
    if view.selects("permissionsUpdatedAt") {
        resource.permissions_updated_at = Some(room.permissions_updated_at);
    }

    if view.selects("config") && view.can_see_config() {
        resource.config = Some(if view.expand_config {
            ExpandableConfig::Expanded(room.config.clone())
        } else {
            ExpandableConfig::Stub(ExpandableStub {
                expandable: true,
                href: format!(
                    "{}api/v1/rooms/{}?expand=config",
                    public_url, room.room_id
                ),
            })
        });
    }

    if view.selects("roles") && view.can_see_moderation() {
        resource.roles = Some(room.roles.clone());
    }

    if view.selects("anonymous") && view.can_see_moderation() {
        resource.anonymous = Some(room.anonymous.clone());
    }

    resource
}

#[cfg(test)]
mod tests {
    use ovmeet_types::permissions::PermissionSet;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::test_room;

    fn url() -> Url {
        "https://meet.example.com/".parse().unwrap()
    }

    #[test]
    fn management_view_returns_everything_collapsed() {
        let room = test_room("demo-1");
        let resource = serialize_room(&room, &RoomView::management(), &url());

        assert_eq!(resource.room_id, Some(room.room_id.clone()));
        assert!(resource.roles.is_some());
        assert!(matches!(
            resource.config,
            Some(ExpandableConfig::Stub(ExpandableStub {
                expandable: true,
                ..
            }))
        ));
    }

    #[test]
    fn expand_inlines_the_config_subtree() {
        let room = test_room("demo-1");
        let view = RoomView::from_query(None, Some("config"), None);

        let resource = serialize_room(&room, &view, &url());

        assert_eq!(
            resource.config,
            Some(ExpandableConfig::Expanded(room.config.clone()))
        );
    }

    #[test]
    fn fields_selects_a_subset() {
        let room = test_room("demo-1");
        let view = RoomView::from_query(Some("roomId,status"), None, None);

        let resource = serialize_room(&room, &view, &url());

        assert_eq!(resource.room_id, Some(room.room_id.clone()));
        assert_eq!(resource.status, Some(room.status));
        assert_eq!(resource.room_name, None);
        assert_eq!(resource.config, None);
        assert_eq!(resource.roles, None);
    }

    #[test]
    fn missing_permissions_strip_exactly_their_fields() {
        let room = test_room("demo-1");

        let no_config = PermissionSet {
            can_see_room_config: false,
            can_make_moderator: true,
            ..room.role_template(ovmeet_types::rooms::RoomRole::Moderator)
        };
        let resource = serialize_room(
            &room,
            &RoomView {
                fields: None,
                expand_config: true,
                permissions: Some(no_config),
            },
            &url(),
        );
        assert_eq!(resource.config, None);
        assert!(resource.roles.is_some());
        assert!(resource.anonymous.is_some());

        let no_moderation = PermissionSet {
            can_see_room_config: true,
            can_make_moderator: false,
            ..no_config
        };
        let resource = serialize_room(
            &room,
            &RoomView {
                fields: None,
                expand_config: true,
                permissions: Some(no_moderation),
            },
            &url(),
        );
        assert!(resource.config.is_some());
        assert_eq!(resource.roles, None);
        assert_eq!(resource.anonymous, None);

        // Ungated fields survive either way
        assert_eq!(resource.room_id, Some(room.room_id.clone()));
    }
}
