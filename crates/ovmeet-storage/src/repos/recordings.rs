// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use std::sync::Arc;

use ovmeet_types::{
    recordings::{Recording, RecordingId, RecordingSecretsManifest},
    rooms::RoomId,
};

use super::{delete_document, get_document, put_document};
use crate::{Cache, ListPage, ObjectKey, ObjectStore, Result, StorageError};

const SECRETS_FILE: &str = ".secrets.json";

/// Repository for recording metadata and the per-room secrets manifest.
#[derive(Clone)]
pub struct RecordingRepository {
    store: Arc<dyn ObjectStore>,
    cache: Cache,
}

impl RecordingRepository {
    pub(crate) fn new(store: Arc<dyn ObjectStore>, cache: Cache) -> Self {
        Self { store, cache }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get(&self, recording_id: &RecordingId) -> Result<Option<Recording>> {
        get_document(
            &self.store,
            &self.cache,
            &ObjectKey::recording_metadata(recording_id),
        )
        .await
    }

    pub async fn put(&self, recording: &Recording) -> Result<()> {
        put_document(
            &self.store,
            &self.cache,
            &ObjectKey::recording_metadata(&recording.recording_id),
            recording,
        )
        .await
    }

    pub async fn delete_metadata(&self, recording_id: &RecordingId) -> Result<()> {
        delete_document(
            &self.store,
            &self.cache,
            &ObjectKey::recording_metadata(recording_id),
        )
        .await
    }

    /// List one page of recordings, optionally restricted to a room.
    pub async fn list(
        &self,
        room_id: Option<&RoomId>,
        max_items: u32,
        cursor: Option<&str>,
    ) -> Result<(Vec<Recording>, Option<String>)> {
        let prefix = match room_id {
            Some(room_id) => ObjectKey::room_recordings_metadata_prefix(room_id),
            None => ObjectKey::recordings_metadata_prefix(),
        };

        let ListPage { keys, next_token } = self
            .store
            .list(prefix.as_str(), None, max_items, cursor)
            .await?;

        let mut recordings = Vec::with_capacity(keys.len());

        for key in keys {
            // The secrets manifest shares the metadata prefix
            if key.ends_with(SECRETS_FILE) {
                continue;
            }

            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };

            recordings.push(serde_json::from_slice(&raw).map_err(|source| {
                StorageError::CorruptDocument {
                    key: key.clone(),
                    source,
                }
            })?);
        }

        Ok((recordings, next_token))
    }

    /// Whether the room has any recording metadata left.
    pub async fn any_for_room(&self, room_id: &RoomId) -> Result<bool> {
        let ListPage { keys, .. } = self
            .store
            .list(
                ObjectKey::room_recordings_metadata_prefix(room_id).as_str(),
                None,
                2,
                None,
            )
            .await?;

        Ok(keys.iter().any(|key| !key.ends_with(SECRETS_FILE)))
    }

    /// Delete every recording artefact of the room: metadata, media files
    /// and the secrets manifest. Returns the deleted recordings.
    pub async fn delete_all_for_room(&self, room_id: &RoomId) -> Result<Vec<Recording>> {
        let mut deleted = Vec::new();

        loop {
            let (recordings, _) = self.list(Some(room_id), 100, None).await?;

            if recordings.is_empty() {
                break;
            }

            for recording in recordings {
                self.store.delete(&recording.storage_path).await?;
                self.delete_metadata(&recording.recording_id).await?;
                deleted.push(recording);
            }
        }

        self.delete_secrets(room_id).await?;

        Ok(deleted)
    }

    pub async fn get_secrets(&self, room_id: &RoomId) -> Result<Option<RecordingSecretsManifest>> {
        get_document(&self.store, &self.cache, &ObjectKey::room_secrets(room_id)).await
    }

    pub async fn put_secrets(
        &self,
        room_id: &RoomId,
        manifest: &RecordingSecretsManifest,
    ) -> Result<()> {
        put_document(
            &self.store,
            &self.cache,
            &ObjectKey::room_secrets(room_id),
            manifest,
        )
        .await
    }

    pub async fn delete_secrets(&self, room_id: &RoomId) -> Result<()> {
        delete_document(&self.store, &self.cache, &ObjectKey::room_secrets(room_id)).await
    }
}
