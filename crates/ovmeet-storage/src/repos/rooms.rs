// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use std::sync::Arc;

use ovmeet_types::rooms::{Room, RoomId, RoomStatus};

use super::{delete_document, get_document, put_document};
use crate::{Cache, ListPage, ObjectKey, ObjectStore, Result, StorageError};

/// Repository for room documents.
#[derive(Clone)]
pub struct RoomRepository {
    store: Arc<dyn ObjectStore>,
    cache: Cache,
}

impl RoomRepository {
    pub(crate) fn new(store: Arc<dyn ObjectStore>, cache: Cache) -> Self {
        Self { store, cache }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get(&self, room_id: &RoomId) -> Result<Option<Room>> {
        get_document(&self.store, &self.cache, &ObjectKey::room(room_id)).await
    }

    pub async fn exists(&self, room_id: &RoomId) -> Result<bool> {
        Ok(self
            .store
            .size_if_exists(ObjectKey::room(room_id).as_str())
            .await?
            .is_some())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(room_id = %room.room_id))]
    pub async fn put(&self, room: &Room) -> Result<()> {
        put_document(&self.store, &self.cache, &ObjectKey::room(&room.room_id), room).await
    }

    pub async fn delete(&self, room_id: &RoomId) -> Result<()> {
        delete_document(&self.store, &self.cache, &ObjectKey::room(room_id)).await
    }

    /// List one page of rooms.
    ///
    /// The page cursor comes straight from the object store and is opaque
    /// to callers; the cache never paginates.
    pub async fn list(
        &self,
        max_items: u32,
        cursor: Option<&str>,
    ) -> Result<(Vec<Room>, Option<String>)> {
        let ListPage { keys, next_token } = self
            .store
            .list(
                ObjectKey::rooms_prefix().as_str(),
                Some("/"),
                max_items,
                cursor,
            )
            .await?;

        let mut rooms = Vec::with_capacity(keys.len());

        for key in keys {
            let Some(raw) = self.store.get(&key).await? else {
                // Deleted between listing and fetching
                continue;
            };

            rooms.push(serde_json::from_slice(&raw).map_err(|source| {
                StorageError::CorruptDocument {
                    key: key.clone(),
                    source,
                }
            })?);
        }

        Ok((rooms, next_token))
    }

    /// Update a room only when its current status is one of `expected`.
    ///
    /// The room status machine is serialised through this check; a caller
    /// observing a stale status receives [`StorageError::UpdateConflict`]
    /// and must re-read.
    pub async fn update_if_status(
        &self,
        room_id: &RoomId,
        expected: &[RoomStatus],
        mutate: impl FnOnce(&mut Room),
    ) -> Result<Room> {
        let key = ObjectKey::room(room_id);

        let Some(mut room) = self.get(room_id).await? else {
            return Err(StorageError::UpdateConflict {
                key: key.as_str().to_owned(),
            });
        };

        if !expected.contains(&room.status) {
            return Err(StorageError::UpdateConflict {
                key: key.as_str().to_owned(),
            });
        }

        mutate(&mut room);
        self.put(&room).await?;

        Ok(room)
    }
}
