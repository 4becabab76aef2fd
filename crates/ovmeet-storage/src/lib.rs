// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Storage layer of the OvMeet controller.
//!
//! Typed repositories over a write-through redis cache on top of an
//! authoritative S3 object store. Reads try the cache first; writes update
//! the store and the cache, invalidating the cache entry when the write
//! fails so the next reader re-reads the authoritative store.

use snafu::Snafu;

mod cache;
mod init;
mod keys;
mod object_store;
mod repos;

pub use cache::{Cache, CacheError};
pub use init::{StorageInitializer, StorageSeed};
pub use keys::ObjectKey;
pub use object_store::{
    ListPage, MemoryObjectStore, ObjectStore, ObjectStorageError, RangedRead, S3ObjectStore,
};
pub use repos::{
    ConfigRepository, MemberRepository, RecordingRepository, Repositories, RoomRepository,
    UserRepository,
};

pub type Result<T, E = StorageError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum StorageError {
    #[snafu(display("Object storage error: {source}"), context(false))]
    ObjectStorage { source: ObjectStorageError },

    #[snafu(display("Cache error: {message}"))]
    Cache { message: String },

    #[snafu(display("Stored document at {key} is corrupt: {source}"))]
    CorruptDocument {
        key: String,
        source: serde_json::Error,
    },

    /// A conditional update observed a stale precondition; re-read and
    /// retry.
    #[snafu(display("Conditional update of {key} conflicted"))]
    UpdateConflict { key: String },
}
