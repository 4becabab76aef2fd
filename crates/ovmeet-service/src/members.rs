// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Registered and external room members.

use std::sync::Arc;

use chrono::Utc;
use ovmeet_exchange::{EventBus, SystemEvent};
use ovmeet_livekit::{MediaAdapter, MediaError};
use ovmeet_storage::Repositories;
use ovmeet_types::{
    api::{
        error::ApiError,
        members::{
            BulkDeleteMembersResponseBody, FailedMemberDeletion, PatchMemberRequestBody,
            PostMemberRequestBody,
        },
    },
    members::{MemberId, RoomMember},
    rooms::RoomId,
};
use rand::Rng as _;

use crate::{ApiResult, permissions::resolve_effective_permissions};

/// Membership lifecycle and the membership invariants.
#[derive(Clone)]
pub struct MemberService {
    repos: Repositories,
    media: Arc<dyn MediaAdapter>,
    bus: EventBus,
}

impl MemberService {
    pub fn new(repos: Repositories, media: Arc<dyn MediaAdapter>, bus: EventBus) -> Self {
        Self { repos, media, bus }
    }

    /// Add a member to a room.
    ///
    /// Registered users keep their user id as member id; external members
    /// get a freshly generated prefixed identifier. `(roomId, memberId)`
    /// is unique.
    pub async fn create(
        &self,
        room_id: &RoomId,
        body: PostMemberRequestBody,
    ) -> ApiResult<RoomMember> {
        let room = self
            .repos
            .rooms()
            .get(room_id)
            .await?
            .ok_or_else(ApiError::not_found)?;

        let member_id = match &body.user_id {
            Some(user_id) => {
                if self.repos.users().get(user_id).await?.is_none() {
                    return Err(ApiError::not_found()
                        .with_message("The referenced user does not exist")
                        .into());
                }
                MemberId::from_user(user_id)
            }
            None => {
                let suffix: String = rand::rng()
                    .sample_iter(rand::distr::Alphanumeric)
                    .take(12)
                    .map(|c| (c as char).to_ascii_lowercase())
                    .collect();
                MemberId::external(&suffix)
            }
        };

        let members = self.repos.members();

        if members.get(room_id, &member_id).await?.is_some() {
            return Err(ApiError::conflict()
                .with_message("The user is already a member of the room")
                .into());
        }

        let effective_permissions = resolve_effective_permissions(
            &room,
            body.base_role,
            body.custom_permissions.as_ref(),
        );

        let member = RoomMember {
            member_id,
            room_id: room_id.clone(),
            name: body.name,
            base_role: body.base_role,
            custom_permissions: body.custom_permissions.filter(|overrides| !overrides.is_empty()),
            effective_permissions,
            permissions_updated_at: Utc::now(),
            current_participant_identity: None,
        };

        members.put(&member).await?;

        Ok(member)
    }

    pub async fn get(&self, room_id: &RoomId, member_id: &MemberId) -> ApiResult<RoomMember> {
        self.repos
            .members()
            .get(room_id, member_id)
            .await?
            .ok_or_else(|| ApiError::not_found().into())
    }

    pub async fn list(
        &self,
        room_id: &RoomId,
        max_items: u32,
        cursor: Option<&str>,
    ) -> ApiResult<(Vec<RoomMember>, Option<String>)> {
        if self.repos.rooms().get(room_id).await?.is_none() {
            return Err(ApiError::not_found().into());
        }

        Ok(self
            .repos
            .members()
            .list(room_id, max_items.min(100), cursor)
            .await?)
    }

    /// Update a member.
    ///
    /// Mutating the base role or the permission overlay re-materialises
    /// `effectivePermissions` and bumps `permissionsUpdatedAt`, which by
    /// construction invalidates outstanding member tokens.
    pub async fn update(
        &self,
        room_id: &RoomId,
        member_id: &MemberId,
        patch: PatchMemberRequestBody,
    ) -> ApiResult<RoomMember> {
        let room = self
            .repos
            .rooms()
            .get(room_id)
            .await?
            .ok_or_else(ApiError::not_found)?;

        let mut member = self.get(room_id, member_id).await?;

        if let Some(name) = patch.name {
            member.name = name;
        }

        let permissions_changed = patch.base_role.is_some() || patch.custom_permissions.is_some();

        if let Some(base_role) = patch.base_role {
            member.base_role = base_role;
        }
        if let Some(custom_permissions) = patch.custom_permissions {
            member.custom_permissions =
                Some(custom_permissions).filter(|overrides| !overrides.is_empty());
        }

        if permissions_changed {
            member.effective_permissions = resolve_effective_permissions(
                &room,
                member.base_role,
                member.custom_permissions.as_ref(),
            );
            member.permissions_updated_at = Utc::now();
        }

        self.repos.members().put(&member).await?;

        if permissions_changed {
            self.bus.broadcast(&SystemEvent::MemberPermissionsChanged {
                room_id: room_id.clone(),
                member_id: member_id.clone(),
            });
        }

        Ok(member)
    }

    /// Remove a member, evicting the live participant if any.
    pub async fn delete(&self, room_id: &RoomId, member_id: &MemberId) -> ApiResult<()> {
        let member = self.get(room_id, member_id).await?;

        self.repos.members().delete(room_id, member_id).await?;

        if let Some(identity) = &member.current_participant_identity {
            match self.media.remove_participant(room_id, identity).await {
                Ok(()) | Err(MediaError::NotFound) => {}
                Err(e) => {
                    // The membership is gone either way; the participant
                    // drops when their token expires.
                    log::warn!(
                        "Failed to evict participant {identity} from room {room_id}: {e}"
                    );
                }
            }
        }

        Ok(())
    }

    /// Delete several members, aggregating the outcomes.
    pub async fn bulk_delete(
        &self,
        room_id: &RoomId,
        member_ids: &[String],
    ) -> ApiResult<(bool, BulkDeleteMembersResponseBody)> {
        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        let mut seen = std::collections::BTreeSet::new();

        for raw in member_ids {
            let raw = raw.trim();
            if raw.is_empty() || !seen.insert(raw.to_owned()) {
                continue;
            }

            let member_id = MemberId::from(raw.to_owned());

            match self.delete(room_id, &member_id).await {
                Ok(()) => deleted.push(member_id),
                Err(e) => failed.push(FailedMemberDeletion {
                    member_id: raw.to_owned(),
                    error: e.as_api_error().code().to_owned(),
                }),
            }
        }

        let all_ok = failed.is_empty();

        Ok((all_ok, BulkDeleteMembersResponseBody { deleted, failed }))
    }
}

#[cfg(test)]
mod tests {
    use ovmeet_types::{
        permissions::PermissionOverrides,
        rooms::RoomRole,
        users::{User, UserId, UserRole},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::{TestContext, test_room};

    fn room_id() -> RoomId {
        RoomId::parse("demo-1").unwrap()
    }

    async fn seeded(ctx: &TestContext) -> MemberService {
        ctx.repos.rooms().put(&test_room("demo-1")).await.unwrap();
        ctx.member_service()
    }

    fn external_body(name: &str) -> PostMemberRequestBody {
        PostMemberRequestBody {
            user_id: None,
            name: name.into(),
            base_role: RoomRole::Speaker,
            custom_permissions: None,
        }
    }

    #[tokio::test]
    async fn registered_members_reuse_the_user_id() {
        let ctx = TestContext::new().await;
        let members = seeded(&ctx).await;

        ctx.repos
            .users()
            .put(&User {
                user_id: UserId::from("alice"),
                name: "Alice".into(),
                password_hash: "x".into(),
                role: UserRole::User,
                must_change_password: false,
            })
            .await
            .unwrap();

        let member = members
            .create(
                &room_id(),
                PostMemberRequestBody {
                    user_id: Some(UserId::from("alice")),
                    name: "Alice".into(),
                    base_role: RoomRole::Moderator,
                    custom_permissions: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(member.member_id.as_str(), "alice");
        assert!(!member.member_id.is_external());
        assert!(member.effective_permissions.can_make_moderator);

        // (roomId, memberId) is unique
        let err = members
            .create(
                &room_id(),
                PostMemberRequestBody {
                    user_id: Some(UserId::from("alice")),
                    name: "Alice again".into(),
                    base_role: RoomRole::Viewer,
                    custom_permissions: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.as_api_error().status.as_u16(), 409);
    }

    #[tokio::test]
    async fn external_members_get_prefixed_ids() {
        let ctx = TestContext::new().await;
        let members = seeded(&ctx).await;

        let member = members.create(&room_id(), external_body("Guest")).await.unwrap();

        assert!(member.member_id.is_external());
        assert!(member.member_id.as_str().starts_with("ext-"));
    }

    #[tokio::test]
    async fn permission_updates_bump_the_epoch() {
        let ctx = TestContext::new().await;
        let members = seeded(&ctx).await;

        let member = members.create(&room_id(), external_body("Guest")).await.unwrap();
        let epoch = member.permissions_updated_at;

        // A pure rename keeps the epoch
        let renamed = members
            .update(
                &room_id(),
                &member.member_id,
                PatchMemberRequestBody {
                    name: Some("Guest Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.permissions_updated_at, epoch);

        // Overrides re-materialise and bump
        let updated = members
            .update(
                &room_id(),
                &member.member_id,
                PatchMemberRequestBody {
                    custom_permissions: Some(PermissionOverrides {
                        can_record: Some(true),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.permissions_updated_at > epoch);
        assert!(updated.effective_permissions.can_record);
    }

    #[tokio::test]
    async fn deleting_a_joined_member_evicts_the_participant() {
        let ctx = TestContext::new().await;
        let members = seeded(&ctx).await;
        ctx.media.add_room(&room_id(), &["guest-identity"]);

        let mut member = members.create(&room_id(), external_body("Guest")).await.unwrap();
        member.current_participant_identity = Some("guest-identity".into());
        ctx.repos.members().put(&member).await.unwrap();

        members.delete(&room_id(), &member.member_id).await.unwrap();

        assert_eq!(
            ctx.media.removed_participants(),
            vec![("demo-1".to_owned(), "guest-identity".to_owned())]
        );
        assert!(
            ctx.repos
                .members()
                .get(&room_id(), &member.member_id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn bulk_delete_aggregates() {
        let ctx = TestContext::new().await;
        let members = seeded(&ctx).await;

        let a = members.create(&room_id(), external_body("A")).await.unwrap();
        let b = members.create(&room_id(), external_body("B")).await.unwrap();

        let (all_ok, body) = members
            .bulk_delete(
                &room_id(),
                &[
                    a.member_id.to_string(),
                    b.member_id.to_string(),
                    "ext-missing".into(),
                ],
            )
            .await
            .unwrap();

        assert!(!all_ok);
        assert_eq!(body.deleted, vec![a.member_id, b.member_id]);
        assert_eq!(body.failed.len(), 1);
        assert_eq!(body.failed[0].member_id, "ext-missing");
        assert_eq!(body.failed[0].error, "not_found");
    }
}
