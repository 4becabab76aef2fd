// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Recording related API request and response bodies.

use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::{recordings::Recording, rooms::RoomId};

/// Query of `GET /recordings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetRecordingsQuery {
    /// Restrict the listing to a single room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    /// Maximum number of items to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 100))]
    pub max_items: Option<u32>,
    /// Cursor of the page to fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Body of `GET /recordings` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRecordingsResponseBody {
    /// One page of recordings.
    pub recordings: Vec<Recording>,
    /// Cursor of the next page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Body of `POST /internal-api/v1/recordings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecordingStartRequestBody {
    /// The room to record.
    pub room_id: RoomId,
}

/// Query of `DELETE /recordings` and `GET /recordings/download`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingIdsQuery {
    /// Comma separated list of recording ids.
    pub recording_ids: String,
}

/// A failed entry of a bulk recording deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRecordingDeletion {
    /// The recording id as supplied by the client.
    pub recording_id: String,
    /// Machine readable error code.
    pub error: String,
}

/// Body of `DELETE /recordings` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRecordingsResponseBody {
    /// Recordings that were deleted.
    pub deleted: Vec<String>,
    /// Recordings that could not be deleted.
    pub not_deleted: Vec<FailedRecordingDeletion>,
}

/// Body of `GET /recordings/{id}/url` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRecordingUrlResponseBody {
    /// Short-lived media access URL.
    pub url: Url,
}
