// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use std::sync::Arc;

use ovmeet_types::{
    members::{MemberId, RoomMember},
    rooms::RoomId,
};

use super::{delete_document, get_document, put_document};
use crate::{Cache, ListPage, ObjectKey, ObjectStore, Result, StorageError};

/// Repository for room member documents.
#[derive(Clone)]
pub struct MemberRepository {
    store: Arc<dyn ObjectStore>,
    cache: Cache,
}

impl MemberRepository {
    pub(crate) fn new(store: Arc<dyn ObjectStore>, cache: Cache) -> Self {
        Self { store, cache }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get(&self, room_id: &RoomId, member_id: &MemberId) -> Result<Option<RoomMember>> {
        get_document(
            &self.store,
            &self.cache,
            &ObjectKey::member(room_id, member_id),
        )
        .await
    }

    pub async fn put(&self, member: &RoomMember) -> Result<()> {
        put_document(
            &self.store,
            &self.cache,
            &ObjectKey::member(&member.room_id, &member.member_id),
            member,
        )
        .await
    }

    pub async fn delete(&self, room_id: &RoomId, member_id: &MemberId) -> Result<()> {
        delete_document(
            &self.store,
            &self.cache,
            &ObjectKey::member(room_id, member_id),
        )
        .await
    }

    /// List one page of the room's members.
    pub async fn list(
        &self,
        room_id: &RoomId,
        max_items: u32,
        cursor: Option<&str>,
    ) -> Result<(Vec<RoomMember>, Option<String>)> {
        let ListPage { keys, next_token } = self
            .store
            .list(
                ObjectKey::members_prefix(room_id).as_str(),
                None,
                max_items,
                cursor,
            )
            .await?;

        let mut members = Vec::with_capacity(keys.len());

        for key in keys {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };

            members.push(serde_json::from_slice(&raw).map_err(|source| {
                StorageError::CorruptDocument {
                    key: key.clone(),
                    source,
                }
            })?);
        }

        Ok((members, next_token))
    }

    /// Delete every member of the room, returning the deleted members.
    ///
    /// Used by the room deletion cascade.
    pub async fn delete_all(&self, room_id: &RoomId) -> Result<Vec<RoomMember>> {
        let mut deleted = Vec::new();

        // Re-list from the start after each deleted page; a cursor taken
        // before the deletes could skip entries.
        loop {
            let (members, _) = self.list(room_id, 100, None).await?;

            if members.is_empty() {
                break;
            }

            for member in members {
                self.delete(room_id, &member.member_id).await?;
                deleted.push(member);
            }
        }

        Ok(deleted)
    }
}
