// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Room member endpoints.

use actix_web::{
    HttpResponse, delete, get, patch, post,
    web::{Data, Json, Path, Query, ReqData},
};
use ovmeet_service::{MemberService, TokenService};
use ovmeet_types::{
    api::{
        error::ApiError,
        members::{
            BulkDeleteMembersQuery, GetMembersResponseBody, PatchMemberRequestBody,
            PostMemberRequestBody, PostMemberTokenResponseBody,
        },
        pagination::PaginationQuery,
    },
    members::MemberId,
    rooms::RoomId,
};
use validator::Validate as _;

use crate::api::{AuthContext, context};

#[post("/rooms/{room_id}/members")]
pub async fn create(
    ctx: Option<ReqData<AuthContext>>,
    members: Data<MemberService>,
    room_id: Path<RoomId>,
    body: Json<PostMemberRequestBody>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_management()?;

    let body = body.into_inner();
    body.validate()?;

    let member = members.create(&room_id, body).await?;

    Ok(HttpResponse::Created().json(member))
}

#[get("/rooms/{room_id}/members")]
pub async fn list(
    ctx: Option<ReqData<AuthContext>>,
    members: Data<MemberService>,
    room_id: Path<RoomId>,
    pagination: Query<PaginationQuery>,
) -> Result<Json<GetMembersResponseBody>, ApiError> {
    context(&ctx)?.require_management()?;

    let pagination = pagination.into_inner();
    pagination.validate()?;

    let (page, next_page_token) = members
        .list(
            &room_id,
            pagination.max_items,
            pagination.next_page_token.as_deref(),
        )
        .await?;

    Ok(Json(GetMembersResponseBody {
        members: page,
        next_page_token,
    }))
}

#[patch("/rooms/{room_id}/members/{member_id}")]
pub async fn update(
    ctx: Option<ReqData<AuthContext>>,
    members: Data<MemberService>,
    path: Path<(RoomId, MemberId)>,
    body: Json<PatchMemberRequestBody>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_management()?;

    let (room_id, member_id) = path.into_inner();
    let body = body.into_inner();
    body.validate()?;

    let member = members.update(&room_id, &member_id, body).await?;

    Ok(HttpResponse::Ok().json(member))
}

#[delete("/rooms/{room_id}/members/{member_id}")]
pub async fn delete(
    ctx: Option<ReqData<AuthContext>>,
    members: Data<MemberService>,
    path: Path<(RoomId, MemberId)>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_management()?;

    let (room_id, member_id) = path.into_inner();

    members.delete(&room_id, &member_id).await?;

    Ok(HttpResponse::Ok().finish())
}

#[delete("/rooms/{room_id}/members")]
pub async fn bulk_delete(
    ctx: Option<ReqData<AuthContext>>,
    members: Data<MemberService>,
    room_id: Path<RoomId>,
    query: Query<BulkDeleteMembersQuery>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_management()?;

    let member_ids: Vec<String> = query.member_ids.split(',').map(ToOwned::to_owned).collect();

    let (all_ok, body) = members.bulk_delete(&room_id, &member_ids).await?;

    if all_ok {
        Ok(HttpResponse::Ok().json(body))
    } else {
        Ok(HttpResponse::BadRequest().json(body))
    }
}

/// Mint a room member token for a durable member.
#[post("/rooms/{room_id}/members/{member_id}/token")]
pub async fn mint_token(
    ctx: Option<ReqData<AuthContext>>,
    members: Data<MemberService>,
    tokens: Data<TokenService>,
    path: Path<(RoomId, MemberId)>,
) -> Result<Json<PostMemberTokenResponseBody>, ApiError> {
    context(&ctx)?.require_management()?;

    let (room_id, member_id) = path.into_inner();

    let member = members.get(&room_id, &member_id).await?;

    Ok(Json(PostMemberTokenResponseBody {
        token: tokens.mint_member(&member),
    }))
}
