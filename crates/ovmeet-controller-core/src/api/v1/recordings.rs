// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Recording endpoints, including the ranged media stream.

use actix_web::{
    HttpRequest, HttpResponse, delete, get,
    http::header,
    web::{Data, Json, Path, Query, ReqData},
};
use ovmeet_service::RecordingService;
use ovmeet_types::{
    api::{
        error::ApiError,
        recordings::{
            GetRecordingUrlResponseBody, GetRecordingsQuery, GetRecordingsResponseBody,
            RecordingIdsQuery,
        },
    },
    permissions::PermissionSet,
    recordings::{Recording, RecordingId},
    rooms::RoomId,
};
use serde::{Deserialize, Serialize};
use validator::Validate as _;

use crate::api::{AuthContext, context};

/// Resolve the room scope a recordings request may touch.
///
/// Management touches everything; a room member needs the gating
/// permission and stays confined to their own room.
fn room_scope(
    ctx: &AuthContext,
    requested: Option<RoomId>,
    allowed: impl Fn(&PermissionSet) -> bool,
) -> Result<Option<RoomId>, ApiError> {
    if ctx.is_management() {
        return Ok(requested);
    }

    match ctx {
        AuthContext::Member(claims) => {
            if !allowed(&claims.permissions) {
                return Err(ApiError::forbidden());
            }

            match requested {
                Some(room) if room != claims.room_id => Err(ApiError::forbidden()),
                _ => Ok(Some(claims.room_id.clone())),
            }
        }
        _ => Err(ApiError::unauthorized()),
    }
}

fn check_recording_access(
    ctx: &AuthContext,
    recording: &Recording,
    allowed: impl Fn(&PermissionSet) -> bool,
) -> Result<(), ApiError> {
    let _ = room_scope(ctx, Some(recording.room_id.clone()), allowed)?;
    Ok(())
}

#[get("/recordings")]
pub async fn list(
    ctx: Option<ReqData<AuthContext>>,
    recordings: Data<RecordingService>,
    query: Query<GetRecordingsQuery>,
) -> Result<Json<GetRecordingsResponseBody>, ApiError> {
    let query = query.into_inner();
    query.validate()?;

    let room_scope = room_scope(context(&ctx)?, query.room_id, |permissions| {
        permissions.can_retrieve_recordings
    })?;

    let (page, next_page_token) = recordings
        .list(
            room_scope.as_ref(),
            query.max_items.unwrap_or(50),
            query.next_page_token.as_deref(),
        )
        .await?;

    Ok(Json(GetRecordingsResponseBody {
        recordings: page,
        next_page_token,
    }))
}

#[get("/recordings/download")]
pub async fn download(
    ctx: Option<ReqData<AuthContext>>,
    recordings: Data<RecordingService>,
    query: Query<RecordingIdsQuery>,
) -> Result<Json<Vec<RecordingDownloadEntry>>, ApiError> {
    let ctx = context(&ctx)?;

    let mut entries = Vec::new();

    for raw in query.recording_ids.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let recording_id =
            RecordingId::parse(raw).map_err(|_| ApiError::not_found())?;
        let recording = recordings.get(&recording_id).await?;
        check_recording_access(ctx, &recording, |permissions| {
            permissions.can_retrieve_recordings
        })?;

        entries.push(RecordingDownloadEntry {
            recording_id: recording_id.clone(),
            url: recordings.get_url(&recording_id).await?,
        });
    }

    Ok(Json(entries))
}

/// One entry of the bulk download listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingDownloadEntry {
    pub recording_id: RecordingId,
    pub url: url::Url,
}

#[get("/recordings/{recording_id}")]
pub async fn get(
    ctx: Option<ReqData<AuthContext>>,
    recordings: Data<RecordingService>,
    recording_id: Path<RecordingId>,
) -> Result<Json<Recording>, ApiError> {
    let recording = recordings.get(&recording_id).await?;

    check_recording_access(context(&ctx)?, &recording, |permissions| {
        permissions.can_retrieve_recordings
    })?;

    Ok(Json(recording))
}

#[delete("/recordings/{recording_id}")]
pub async fn delete(
    ctx: Option<ReqData<AuthContext>>,
    recordings: Data<RecordingService>,
    recording_id: Path<RecordingId>,
) -> Result<HttpResponse, ApiError> {
    let recording = recordings.get(&recording_id).await?;

    check_recording_access(context(&ctx)?, &recording, |permissions| {
        permissions.can_delete_recordings
    })?;

    recordings.delete(&recording_id).await?;

    Ok(HttpResponse::Ok().finish())
}

#[delete("/recordings")]
pub async fn bulk_delete(
    ctx: Option<ReqData<AuthContext>>,
    recordings: Data<RecordingService>,
    query: Query<RecordingIdsQuery>,
) -> Result<HttpResponse, ApiError> {
    let ctx = context(&ctx)?;
    // Bulk deletion across rooms is a management operation
    ctx.require_management()?;

    let recording_ids: Vec<String> = query
        .recording_ids
        .split(',')
        .map(ToOwned::to_owned)
        .collect();

    let (all_ok, body) = recordings.bulk_delete(&recording_ids).await?;

    if all_ok {
        Ok(HttpResponse::Ok().json(body))
    } else {
        Ok(HttpResponse::BadRequest().json(body))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaQuery {
    secret: Option<String>,
}

/// Stream the recording media.
///
/// Supports `Range` requests (206 with `Content-Range`) and, besides the
/// usual tokens, access through the shareable secret embedded in download
/// URLs.
#[get("/recordings/{recording_id}/media")]
pub async fn media(
    ctx: Option<ReqData<AuthContext>>,
    recordings: Data<RecordingService>,
    recording_id: Path<RecordingId>,
    query: Query<MediaQuery>,
    request: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let recording_id = recording_id.into_inner();
    let recording = recordings.get(&recording_id).await?;

    let secret_grants = match &query.secret {
        Some(secret) => recordings.verify_media_secret(&recording_id, secret).await?,
        None => false,
    };

    if !secret_grants {
        check_recording_access(context(&ctx)?, &recording, |permissions| {
            permissions.can_retrieve_recordings
        })?;
    }

    let range = request
        .headers()
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let read = recordings.get_as_stream(&recording_id, range).await?;

    let content_type = match recording.encoding.container.as_str() {
        "mp4" => "video/mp4",
        "ogg" => "audio/ogg",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    };

    let mut response = if read.partial {
        let mut response = HttpResponse::PartialContent();
        let _ = response.insert_header((
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", read.start, read.end, read.file_size),
        ));
        response
    } else {
        HttpResponse::Ok()
    };

    let _ = response
        .insert_header((header::ACCEPT_RANGES, "bytes"))
        .insert_header((header::CONTENT_TYPE, content_type));

    Ok(response
        .no_chunking(read.end - read.start + 1)
        .streaming(read.body))
}

#[get("/recordings/{recording_id}/url")]
pub async fn url(
    ctx: Option<ReqData<AuthContext>>,
    recordings: Data<RecordingService>,
    recording_id: Path<RecordingId>,
) -> Result<Json<GetRecordingUrlResponseBody>, ApiError> {
    let recording = recordings.get(&recording_id).await?;

    check_recording_access(context(&ctx)?, &recording, |permissions| {
        permissions.can_retrieve_recordings
    })?;

    Ok(Json(GetRecordingUrlResponseBody {
        url: recordings.get_url(&recording_id).await?,
    }))
}
