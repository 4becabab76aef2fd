// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Login, token refresh and password changes.

use actix_web::{
    post,
    web::{Data, Json, ReqData},
};
use ovmeet_service::AuthService;
use ovmeet_types::{
    api::{
        auth::{
            PostChangePasswordRequestBody, PostLoginRequestBody, PostRefreshRequestBody,
            TokenPairResponseBody,
        },
        error::ApiError,
    },
    users::UserId,
};
use validator::Validate as _;

use crate::api::{AuthContext, context};

#[post("/auth/login")]
pub async fn login(
    auth: Data<AuthService>,
    body: Json<PostLoginRequestBody>,
) -> Result<Json<TokenPairResponseBody>, ApiError> {
    let body = body.into_inner();
    body.validate()?;

    Ok(Json(auth.login(&body.user_id, &body.password).await?))
}

#[post("/auth/refresh")]
pub async fn refresh(
    auth: Data<AuthService>,
    body: Json<PostRefreshRequestBody>,
) -> Result<Json<TokenPairResponseBody>, ApiError> {
    let body = body.into_inner();
    body.validate()?;

    Ok(Json(auth.refresh(&body.refresh_token).await?))
}

/// Change the password of the authenticated user.
///
/// Allowed while `must_change_password` is still set; this is the one
/// operation such accounts may perform.
#[post("/auth/change-password")]
pub async fn change_password(
    ctx: Option<ReqData<AuthContext>>,
    auth: Data<AuthService>,
    body: Json<PostChangePasswordRequestBody>,
) -> Result<Json<TokenPairResponseBody>, ApiError> {
    let claims = context(&ctx)?.require_user()?.clone();

    let body = body.into_inner();
    body.validate()?;

    Ok(Json(
        auth.change_password(
            &UserId::from(claims.sub),
            &body.current_password,
            &body.new_password,
        )
        .await?,
    ))
}
