// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Public API v1 endpoints.

use actix_web::{Scope, web};

pub mod members;
pub mod recordings;
pub mod rooms;

/// Build the `/api/v1` scope.
pub fn scope() -> Scope {
    web::scope("/api/v1")
        .service(rooms::create)
        .service(rooms::list)
        .service(rooms::bulk_delete)
        .service(rooms::get)
        .service(rooms::delete)
        .service(rooms::update_config)
        .service(rooms::update_status)
        .service(rooms::update_roles)
        .service(rooms::update_anonymous)
        .service(rooms::anonymous_token)
        .service(members::create)
        .service(members::list)
        .service(members::bulk_delete)
        .service(members::update)
        .service(members::delete)
        .service(members::mint_token)
        .service(recordings::list)
        .service(recordings::bulk_delete)
        .service(recordings::download)
        .service(recordings::get)
        .service(recordings::delete)
        .service(recordings::media)
        .service(recordings::url)
}
