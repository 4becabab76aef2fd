// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Room related endpoints.

use actix_web::{
    HttpResponse, delete, get, post, put,
    web::{Data, Json, Path, Query, ReqData},
};
use ovmeet_service::{RoomService, RoomView, ServiceConfig, TokenService, serialize_room};
use ovmeet_types::{
    api::{
        error::ApiError,
        members::PostMemberTokenResponseBody,
        rooms::{
            BulkDeleteRoomsQuery, DeleteRoomQuery, GetRoomQuery, GetRoomsQuery,
            GetRoomsResponseBody, PostRoomsRequestBody, PutRoomAnonymousRequestBody,
            PutRoomRolesRequestBody, PutRoomStatusRequestBody, RoomDeletionResponseBody,
        },
    },
    rooms::{RoomConfig, RoomId},
};
use serde::Deserialize;
use validator::Validate as _;

use crate::api::{AuthContext, context};

#[post("/rooms")]
pub async fn create(
    ctx: Option<ReqData<AuthContext>>,
    rooms: Data<RoomService>,
    config: Data<ServiceConfig>,
    body: Json<PostRoomsRequestBody>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_management()?;

    let body = body.into_inner();
    body.validate()?;

    let room = rooms.create(body).await?;

    Ok(HttpResponse::Created().json(serialize_room(
        &room,
        &RoomView::management(),
        &config.public_url,
    )))
}

#[get("/rooms")]
pub async fn list(
    ctx: Option<ReqData<AuthContext>>,
    rooms: Data<RoomService>,
    config: Data<ServiceConfig>,
    query: Query<GetRoomsQuery>,
) -> Result<Json<GetRoomsResponseBody>, ApiError> {
    context(&ctx)?.require_management()?;

    let query = query.into_inner();
    query.validate()?;

    let (page, next_page_token) = rooms.list(&query).await?;

    let view = RoomView::from_query(query.fields.as_deref(), query.expand.as_deref(), None);

    Ok(Json(GetRoomsResponseBody {
        rooms: page
            .iter()
            .map(|room| serialize_room(room, &view, &config.public_url))
            .collect(),
        next_page_token,
    }))
}

#[get("/rooms/{room_id}")]
pub async fn get(
    ctx: Option<ReqData<AuthContext>>,
    rooms: Data<RoomService>,
    config: Data<ServiceConfig>,
    room_id: Path<RoomId>,
    query: Query<GetRoomQuery>,
) -> Result<HttpResponse, ApiError> {
    let ctx = context(&ctx)?;
    let room_id = room_id.into_inner();

    // Management sees everything; a member of the room sees the fields
    // their permissions allow.
    let permissions = if ctx.is_management() {
        None
    } else {
        let claims = ctx
            .member_of(&room_id)
            .ok_or_else(|| match ctx {
                AuthContext::Anonymous => ApiError::unauthorized(),
                _ => ApiError::forbidden(),
            })?;
        Some(claims.permissions)
    };

    let room = rooms.get(&room_id).await?;

    let view = RoomView::from_query(query.fields.as_deref(), query.expand.as_deref(), permissions);

    Ok(HttpResponse::Ok().json(serialize_room(&room, &view, &config.public_url)))
}

#[delete("/rooms/{room_id}")]
pub async fn delete(
    ctx: Option<ReqData<AuthContext>>,
    rooms: Data<RoomService>,
    config: Data<ServiceConfig>,
    room_id: Path<RoomId>,
    query: Query<DeleteRoomQuery>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_management()?;

    let outcome = rooms
        .delete(&room_id, query.with_meeting, query.with_recordings)
        .await?;

    let body = RoomDeletionResponseBody {
        code: outcome.code,
        message: outcome.message(),
        room: outcome
            .room
            .as_ref()
            .map(|room| serialize_room(room, &RoomView::management(), &config.public_url)),
    };

    Ok(HttpResponse::build(outcome.status).json(body))
}

#[delete("/rooms")]
pub async fn bulk_delete(
    ctx: Option<ReqData<AuthContext>>,
    rooms: Data<RoomService>,
    query: Query<BulkDeleteRoomsQuery>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_management()?;

    let room_ids: Vec<String> = query.room_ids.split(',').map(ToOwned::to_owned).collect();

    let (all_ok, body) = rooms
        .bulk_delete(&room_ids, query.with_meeting, query.with_recordings)
        .await?;

    if all_ok {
        Ok(HttpResponse::Ok().json(body))
    } else {
        Ok(HttpResponse::BadRequest().json(body))
    }
}

#[put("/rooms/{room_id}/config")]
pub async fn update_config(
    ctx: Option<ReqData<AuthContext>>,
    rooms: Data<RoomService>,
    config: Data<ServiceConfig>,
    room_id: Path<RoomId>,
    body: Json<RoomConfig>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_management()?;

    let room = rooms.update_config(&room_id, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serialize_room(
        &room,
        &RoomView::management(),
        &config.public_url,
    )))
}

#[put("/rooms/{room_id}/status")]
pub async fn update_status(
    ctx: Option<ReqData<AuthContext>>,
    rooms: Data<RoomService>,
    config: Data<ServiceConfig>,
    room_id: Path<RoomId>,
    body: Json<PutRoomStatusRequestBody>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_management()?;

    let room = rooms.update_status(&room_id, body.status).await?;

    Ok(HttpResponse::Ok().json(serialize_room(
        &room,
        &RoomView::management(),
        &config.public_url,
    )))
}

#[put("/rooms/{room_id}/roles")]
pub async fn update_roles(
    ctx: Option<ReqData<AuthContext>>,
    rooms: Data<RoomService>,
    config: Data<ServiceConfig>,
    room_id: Path<RoomId>,
    body: Json<PutRoomRolesRequestBody>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_management()?;

    let room = rooms.update_roles(&room_id, body.into_inner().roles).await?;

    Ok(HttpResponse::Ok().json(serialize_room(
        &room,
        &RoomView::management(),
        &config.public_url,
    )))
}

#[put("/rooms/{room_id}/anonymous")]
pub async fn update_anonymous(
    ctx: Option<ReqData<AuthContext>>,
    rooms: Data<RoomService>,
    config: Data<ServiceConfig>,
    room_id: Path<RoomId>,
    body: Json<PutRoomAnonymousRequestBody>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_management()?;

    let room = rooms
        .update_anonymous(&room_id, body.into_inner().roles)
        .await?;

    Ok(HttpResponse::Ok().json(serialize_room(
        &room,
        &RoomView::management(),
        &config.public_url,
    )))
}

#[derive(Debug, Deserialize)]
pub struct AnonymousTokenQuery {
    secret: String,
}

/// Mint a room member token through an anonymous access URL.
///
/// The secret embedded in the shared URL is the credential; no other
/// authentication applies.
#[post("/rooms/{room_id}/anonymous/token")]
pub async fn anonymous_token(
    rooms: Data<RoomService>,
    tokens: Data<TokenService>,
    room_id: Path<RoomId>,
    query: Query<AnonymousTokenQuery>,
) -> Result<Json<PostMemberTokenResponseBody>, ApiError> {
    let room = rooms.get(&room_id).await?;

    let role = room
        .anonymous
        .resolve_secret(&query.secret)
        .ok_or_else(|| ApiError::unauthorized().with_message("Unknown access secret"))?;

    let token = tokens
        .mint_anonymous(&room, role)
        .ok_or_else(|| ApiError::unauthorized().with_message("Unknown access secret"))?;

    Ok(Json(PostMemberTokenResponseBody { token }))
}
