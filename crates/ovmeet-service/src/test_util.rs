// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Shared fixtures for the service tests.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use ovmeet_exchange::{EventBus, ExchangeTask};
use ovmeet_livekit::MockMediaAdapter;
use ovmeet_lock::{LockManager, MemoryLockManager};
use ovmeet_storage::{Cache, MemoryObjectStore, Repositories};
use ovmeet_types::{
    config::GlobalConfig,
    rooms::{AnonymousAccess, MeetingEndAction, Room, RoomConfig, RoomId, RoomStatus},
};

use crate::{
    AuthService, MemberService, RecordingService, RoomService, ServiceConfig, TokenService,
    WebhookSink,
};

/// Everything a service test needs, over in-memory backends.
pub(crate) struct TestContext {
    pub repos: Repositories,
    pub locks: Arc<dyn LockManager>,
    pub bus: EventBus,
    pub media: Arc<MockMediaAdapter>,
    pub config: ServiceConfig,
}

impl TestContext {
    pub async fn new() -> Self {
        let repos = Repositories::new(
            Arc::new(MemoryObjectStore::new()),
            Cache::memory("test", Duration::from_secs(60)),
        );
        let bus = EventBus::new(ExchangeTask::spawn());

        Self {
            repos,
            locks: Arc::new(MemoryLockManager::new("replica-test")),
            bus,
            media: Arc::new(MockMediaAdapter::new()),
            config: ServiceConfig::for_tests(),
        }
    }

    pub fn room_service(&self) -> RoomService {
        RoomService::new(
            self.repos.clone(),
            self.media.clone(),
            self.locks.clone(),
            self.bus.clone(),
            self.config.clone(),
        )
    }

    pub fn recording_service(&self) -> RecordingService {
        RecordingService::new(
            self.repos.clone(),
            self.media.clone(),
            self.locks.clone(),
            self.bus.clone(),
            self.config.clone(),
        )
    }

    pub fn member_service(&self) -> MemberService {
        MemberService::new(self.repos.clone(), self.media.clone(), self.bus.clone())
    }

    pub fn token_service(&self) -> TokenService {
        TokenService::new(
            "test-secret",
            Duration::from_secs(900),
            Duration::from_secs(86400),
            Duration::from_secs(3600),
        )
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.repos.clone(), self.token_service())
    }

    pub fn webhook_sink(&self) -> WebhookSink {
        WebhookSink::new(
            self.room_service(),
            self.recording_service(),
            self.locks.clone(),
        )
    }
}

/// A bare open room with the default templates.
pub(crate) fn test_room(id: &str) -> Room {
    Room {
        room_id: RoomId::parse(id).unwrap(),
        room_name: "Test room".into(),
        creation_date: Utc::now(),
        auto_deletion_date: None,
        auto_deletion_policy: None,
        config: RoomConfig::default(),
        roles: GlobalConfig::default().default_roles,
        anonymous: AnonymousAccess::default(),
        status: RoomStatus::Open,
        meeting_end_action: MeetingEndAction::None,
        permissions_updated_at: Utc::now(),
    }
}

/// The same room in the `active_meeting` state.
pub(crate) fn test_room_with_meeting(id: &str) -> Room {
    Room {
        status: RoomStatus::ActiveMeeting,
        ..test_room(id)
    }
}
