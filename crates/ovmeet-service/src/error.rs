// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Funnel from internal error kinds into the REST [`ApiError`].

use ovmeet_exchange::WaitError;
use ovmeet_livekit::MediaError;
use ovmeet_lock::LockError;
use ovmeet_storage::{ObjectStorageError, StorageError};
use ovmeet_types::api::error::ApiError;

/// Wrapper around [`ApiError`] that captures internal error kinds at the
/// service boundary.
///
/// Transport-level unavailability of a dependency (media server, cache,
/// object store, lock store) maps to 503; everything else keeps its kind.
#[derive(Debug)]
pub struct CaptureApiError {
    inner: ApiError,
}

impl CaptureApiError {
    /// The HTTP error this capture resolves to.
    pub fn into_api_error(self) -> ApiError {
        self.inner
    }

    pub fn as_api_error(&self) -> &ApiError {
        &self.inner
    }
}

impl std::fmt::Display for CaptureApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl std::error::Error for CaptureApiError {}

impl From<ApiError> for CaptureApiError {
    fn from(inner: ApiError) -> Self {
        Self { inner }
    }
}

impl From<CaptureApiError> for ApiError {
    fn from(value: CaptureApiError) -> Self {
        value.inner
    }
}

impl From<StorageError> for CaptureApiError {
    fn from(value: StorageError) -> Self {
        let inner = match &value {
            StorageError::ObjectStorage { source } => match source {
                ObjectStorageError::NotFound { .. } => ApiError::not_found(),
                ObjectStorageError::RangeNotSatisfiable { .. } => {
                    ApiError::range_not_satisfiable()
                }
                _ => {
                    log::error!("Object storage failure: {value}");
                    ApiError::service_unavailable()
                }
            },
            StorageError::Cache { .. } => {
                log::error!("Cache failure: {value}");
                ApiError::service_unavailable()
            }
            StorageError::CorruptDocument { .. } => {
                log::error!("Corrupt stored document: {value}");
                ApiError::internal()
            }
            StorageError::UpdateConflict { .. } => ApiError::conflict(),
        };

        Self { inner }
    }
}

impl From<MediaError> for CaptureApiError {
    fn from(value: MediaError) -> Self {
        let inner = match &value {
            MediaError::NotFound => ApiError::not_found(),
            MediaError::Conflict => ApiError::conflict(),
            MediaError::Unavailable { .. } => {
                log::error!("Media server unavailable: {value}");
                ApiError::service_unavailable()
            }
            MediaError::Internal { .. } => {
                log::error!("Media server failure: {value}");
                ApiError::internal()
            }
        };

        Self { inner }
    }
}

impl From<LockError> for CaptureApiError {
    fn from(value: LockError) -> Self {
        log::error!("Lock store failure: {value}");

        Self {
            inner: ApiError::service_unavailable(),
        }
    }
}

impl From<WaitError> for CaptureApiError {
    fn from(value: WaitError) -> Self {
        log::error!("Event bus failure: {value}");

        Self {
            inner: ApiError::internal(),
        }
    }
}

