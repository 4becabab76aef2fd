// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Management API key endpoints.

use actix_web::{
    HttpResponse, delete, get, post,
    web::{Data, Json, ReqData},
};
use ovmeet_service::AuthService;
use ovmeet_types::api::{auth::ApiKeyResponseBody, error::ApiError};

use crate::api::{AuthContext, context};

#[post("/api-keys")]
pub async fn create(
    ctx: Option<ReqData<AuthContext>>,
    auth: Data<AuthService>,
) -> Result<Json<ApiKeyResponseBody>, ApiError> {
    context(&ctx)?.require_admin()?;

    let api_key = auth.create_api_key().await?;

    Ok(Json(ApiKeyResponseBody { api_key }))
}

#[get("/api-keys")]
pub async fn get(
    ctx: Option<ReqData<AuthContext>>,
    auth: Data<AuthService>,
) -> Result<Json<ApiKeyResponseBody>, ApiError> {
    context(&ctx)?.require_admin()?;

    let api_key = auth.get_api_key().await?;

    Ok(Json(ApiKeyResponseBody { api_key }))
}

#[delete("/api-keys")]
pub async fn delete(
    ctx: Option<ReqData<AuthContext>>,
    auth: Data<AuthService>,
) -> Result<HttpResponse, ApiError> {
    context(&ctx)?.require_admin()?;

    auth.delete_api_key().await?;

    Ok(HttpResponse::Ok().finish())
}
