// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use snafu::Snafu;

mod memory;
mod s3;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

#[derive(Debug, Snafu)]
pub enum ObjectStorageError {
    #[snafu(display("{message}: {source}"))]
    InvalidSettings {
        message: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    InvalidResponse {
        message: String,
    },

    Put {
        message: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    Get {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    Delete {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    List {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[snafu(display("the following bucket is missing: {name}"))]
    MissingBucket {
        name: String,
    },

    #[snafu(display("no object stored at {key}"))]
    NotFound {
        key: String,
    },

    #[snafu(display("requested range {start}-{end} lies outside of {key}"))]
    RangeNotSatisfiable {
        key: String,
        start: u64,
        end: u64,
    },
}

impl ObjectStorageError {
    /// Whether the error indicates a missing object rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Streamed object body.
pub type ObjectBody =
    Pin<Box<dyn Stream<Item = Result<Bytes, ObjectStorageError>> + Send + 'static>>;

/// Result of a ranged read: the byte range `start..=end` of an object of
/// `file_size` total bytes.
pub struct RangedRead {
    pub file_size: u64,
    pub start: u64,
    pub end: u64,
    pub body: ObjectBody,
}

impl std::fmt::Debug for RangedRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangedRead")
            .field("file_size", &self.file_size)
            .field("start", &self.start)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

/// One page of a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    /// Keys of this page, in lexicographic order.
    pub keys: Vec<String>,
    /// Opaque cursor of the next page, absent on the last page.
    pub next_token: Option<String>,
}

/// Operations the controller requires from its authoritative object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, overwriting any previous object.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStorageError>;

    /// Fetch the whole object at `key`, `None` when it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, ObjectStorageError>;

    /// Stream the inclusive byte range `start..=end` of the object at
    /// `key`.
    async fn get_range(
        &self,
        key: &str,
        start: u64,
        end: u64,
    ) -> Result<RangedRead, ObjectStorageError>;

    /// Size of the object at `key` in bytes, `None` when it does not
    /// exist.
    async fn size_if_exists(&self, key: &str) -> Result<Option<u64>, ObjectStorageError>;

    /// Delete the object at `key`. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> Result<(), ObjectStorageError>;

    /// List up to `max_keys` keys under `prefix`.
    ///
    /// With a `delimiter`, keys containing the delimiter after the prefix
    /// are rolled up and omitted, mirroring the S3 listing semantics.
    /// `continuation` is the opaque cursor of a previous [`ListPage`].
    async fn list(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        max_keys: u32,
        continuation: Option<&str>,
    ) -> Result<ListPage, ObjectStorageError>;
}
