// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Business logic of the OvMeet controller.
//!
//! The services own the room, recording and member lifecycles; they depend
//! on the storage layer, the media adapter, the lock manager, the event
//! bus and the scheduler, but not on each other. Cross-service workflows
//! go through the event bus or the webhook sink.

mod auth;
mod config;
mod error;
mod gc;
mod members;
mod permissions;
mod recordings;
mod rooms;
mod serializer;
#[cfg(test)]
mod test_util;
mod tokens;
mod webhooks;

pub use auth::AuthService;
pub use config::ServiceConfig;
pub use error::CaptureApiError;
pub use gc::register_garbage_collectors;
pub use members::MemberService;
pub use permissions::resolve_effective_permissions;
pub use recordings::{RecordingService, StreamedRecording};
pub use rooms::{DeletionOutcome, DeletionPlan, RoomService, decide_deletion};
pub use serializer::{RoomView, serialize_room};
pub use tokens::{AccessClaims, MemberClaims, RefreshClaims, TokenError, TokenService};
pub use webhooks::WebhookSink;

/// Result alias used by all service entry points.
pub type ApiResult<T> = std::result::Result<T, CaptureApiError>;
