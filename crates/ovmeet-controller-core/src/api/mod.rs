// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! HTTP surface of the controller.

use actix_web::web::ReqData;
use ovmeet_types::api::error::ApiError;

pub mod auth;
pub mod internal;
pub mod v1;
pub mod webhooks;

pub use auth::{ApiAuth, AuthContext};

/// Fetch the [`AuthContext`] the middleware stored for this request.
fn context(ctx: &Option<ReqData<AuthContext>>) -> Result<&AuthContext, ApiError> {
    ctx.as_deref().ok_or_else(|| {
        log::error!("Request reached a handler without passing the auth middleware");
        ApiError::internal()
    })
}
