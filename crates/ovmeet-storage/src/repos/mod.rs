// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Typed repositories over the object store and the shared cache.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use snafu::ResultExt as _;

use crate::{Cache, CorruptDocumentSnafu, ObjectKey, ObjectStore, Result};

mod config;
mod members;
mod recordings;
mod rooms;
mod users;

pub use config::ConfigRepository;
pub use members::MemberRepository;
pub use recordings::RecordingRepository;
pub use rooms::RoomRepository;
pub use users::UserRepository;

/// Bundle of all repositories over one store and cache.
#[derive(Clone)]
pub struct Repositories {
    store: Arc<dyn ObjectStore>,
    cache: Cache,
}

impl Repositories {
    pub fn new(store: Arc<dyn ObjectStore>, cache: Cache) -> Self {
        Self { store, cache }
    }

    pub fn rooms(&self) -> RoomRepository {
        RoomRepository::new(self.store.clone(), self.cache.clone())
    }

    pub fn members(&self) -> MemberRepository {
        MemberRepository::new(self.store.clone(), self.cache.clone())
    }

    pub fn recordings(&self) -> RecordingRepository {
        RecordingRepository::new(self.store.clone(), self.cache.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.store.clone(), self.cache.clone())
    }

    pub fn config(&self) -> ConfigRepository {
        ConfigRepository::new(self.store.clone(), self.cache.clone())
    }

    /// Direct access to the underlying object store, e.g. for media reads.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}

/// Read a JSON document, trying the cache before the store.
///
/// A store hit populates the cache; cache failures degrade to store reads.
pub(crate) async fn get_document<T>(
    store: &Arc<dyn ObjectStore>,
    cache: &Cache,
    key: &ObjectKey,
) -> Result<Option<T>>
where
    T: Serialize + DeserializeOwned,
{
    match cache.get(key.as_str()).await {
        Ok(Some(value)) => return Ok(Some(value)),
        Ok(None) => {}
        Err(e) => log::warn!("Cache read for {key} failed, falling back to store: {e}"),
    }

    let Some(raw) = store.get(key.as_str()).await? else {
        return Ok(None);
    };

    let value: T = serde_json::from_slice(&raw).context(CorruptDocumentSnafu {
        key: key.as_str().to_owned(),
    })?;

    if let Err(e) = cache.insert(key.as_str(), &value).await {
        log::warn!("Populating cache for {key} failed: {e}");
    }

    Ok(Some(value))
}

/// Write a JSON document to the store and the cache.
///
/// The first failure surfaces to the caller; in that case the cache entry
/// is invalidated so the next reader re-reads the authoritative store.
pub(crate) async fn put_document<T>(
    store: &Arc<dyn ObjectStore>,
    cache: &Cache,
    key: &ObjectKey,
    value: &T,
) -> Result<()>
where
    T: Serialize,
{
    let raw = serde_json::to_vec(value).expect("document serialization cannot fail");

    if let Err(e) = store.put(key.as_str(), Bytes::from(raw)).await {
        if let Err(cache_error) = cache.invalidate(key.as_str()).await {
            log::warn!("Invalidating cache for {key} failed: {cache_error}");
        }

        return Err(e.into());
    }

    if let Err(e) = cache.insert(key.as_str(), value).await {
        if let Err(cache_error) = cache.invalidate(key.as_str()).await {
            log::warn!("Invalidating cache for {key} failed: {cache_error}");
        }

        return Err(e.into());
    }

    Ok(())
}

/// Delete a JSON document from the store and the cache.
pub(crate) async fn delete_document(
    store: &Arc<dyn ObjectStore>,
    cache: &Cache,
    key: &ObjectKey,
) -> Result<()> {
    let store_result = store.delete(key.as_str()).await;

    if let Err(e) = cache.invalidate(key.as_str()).await {
        log::warn!("Invalidating cache for {key} failed: {e}");
    }

    Ok(store_result?)
}
