// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Internal API endpoints for the browser application.

use actix_web::{Scope, web};

pub mod api_keys;
pub mod auth;
pub mod recordings;

/// Build the `/internal-api/v1` scope.
pub fn scope() -> Scope {
    web::scope("/internal-api/v1")
        .service(auth::login)
        .service(auth::refresh)
        .service(auth::change_password)
        .service(api_keys::create)
        .service(api_keys::get)
        .service(api_keys::delete)
        .service(recordings::start)
        .service(recordings::stop)
}
