// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Common data types for the OvMeet controller.
//!
//! This crate contains the domain model (rooms, members, users, recordings)
//! and the REST API types shared between the controller crates.

#![deny(
    bad_style,
    missing_debug_implementations,
    missing_docs,
    overflowing_literals,
    patterns_in_fns_without_body,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

pub mod api;
pub mod auth;
pub mod config;
pub mod members;
pub mod permissions;
pub mod recordings;
pub mod rooms;
pub mod users;
