// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Recording start/stop control endpoints.

use actix_web::{
    post,
    web::{Data, Json, Path, ReqData},
};
use ovmeet_service::RecordingService;
use ovmeet_types::{
    api::{error::ApiError, recordings::PostRecordingStartRequestBody},
    recordings::{Recording, RecordingId},
    rooms::RoomId,
};

use crate::api::{AuthContext, context};

fn require_recording_control(ctx: &AuthContext, room_id: &RoomId) -> Result<(), ApiError> {
    if ctx.is_management() {
        return Ok(());
    }

    match ctx.member_of(room_id) {
        Some(claims) if claims.permissions.can_record => Ok(()),
        Some(_) => Err(ApiError::forbidden()),
        None => Err(ApiError::unauthorized()),
    }
}

#[post("/recordings")]
pub async fn start(
    ctx: Option<ReqData<AuthContext>>,
    recordings: Data<RecordingService>,
    body: Json<PostRecordingStartRequestBody>,
) -> Result<Json<Recording>, ApiError> {
    require_recording_control(context(&ctx)?, &body.room_id)?;

    Ok(Json(recordings.start(&body.room_id).await?))
}

#[post("/recordings/{recording_id}/stop")]
pub async fn stop(
    ctx: Option<ReqData<AuthContext>>,
    recordings: Data<RecordingService>,
    recording_id: Path<RecordingId>,
) -> Result<Json<Recording>, ApiError> {
    require_recording_control(context(&ctx)?, &recording_id.room_id)?;

    Ok(Json(recordings.stop(&recording_id).await?))
}
