// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Room lifecycle: CRUD, the status machine, the deletion policy engine
//! and the room garbage collectors.

use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use http0::StatusCode;
use ovmeet_exchange::{EventBus, SystemEvent};
use ovmeet_livekit::MediaAdapter;
use ovmeet_lock::{LockManager, LockName};
use ovmeet_storage::{Repositories, StorageError};
use ovmeet_types::{
    api::{
        error::{ApiError, ValidationErrorEntry},
        rooms::{AnonymousRoleToggle, BulkDeleteRoomsResponseBody, FailedRoomDeletion, GetRoomsQuery, PostRoomsRequestBody},
    },
    permissions::PermissionSet,
    rooms::{
        AnonymousAccess, AnonymousRoleAccess, MeetingEndAction, Room, RoomDeletionCode, RoomId,
        RoomRole, RoomStatus, WithMeetingPolicy, WithRecordingsPolicy,
    },
};
use rand::Rng as _;
use unicode_normalization::UnicodeNormalization as _;
use url::Url;

use crate::{ApiResult, ServiceConfig, permissions::resolve_effective_permissions};

mod deletion;

pub use deletion::{DeletionPlan, decide_deletion};

/// Result of a deletion request, ready for the HTTP layer.
#[derive(Debug, Clone)]
pub struct DeletionOutcome {
    pub status: StatusCode,
    pub code: RoomDeletionCode,
    pub room: Option<Room>,
}

impl DeletionOutcome {
    pub fn message(&self) -> String {
        deletion_message(self.code).to_owned()
    }
}

/// Room CRUD, status machine and deletion policy engine.
#[derive(Clone)]
pub struct RoomService {
    repos: Repositories,
    media: Arc<dyn MediaAdapter>,
    locks: Arc<dyn LockManager>,
    bus: EventBus,
    config: ServiceConfig,
}

impl RoomService {
    pub fn new(
        repos: Repositories,
        media: Arc<dyn MediaAdapter>,
        locks: Arc<dyn LockManager>,
        bus: EventBus,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repos,
            media,
            locks,
            bus,
            config,
        }
    }

    /// Create a room from the request body.
    #[tracing::instrument(skip_all, fields(room_name = %body.room_name))]
    pub async fn create(&self, body: PostRoomsRequestBody) -> ApiResult<Room> {
        self.check_auto_deletion_date(body.auto_deletion_date.as_ref())?;

        let defaults = self.repos.config().get_global().await?.unwrap_or_default();

        let room_id = self.generate_room_id(&body.room_name).await?;

        let anonymous = self.materialize_anonymous(
            &room_id,
            body.anonymous.unwrap_or_default(),
            AnonymousAccess::default(),
        );

        let now = Utc::now();
        let room = Room {
            room_id,
            room_name: body.room_name,
            creation_date: now,
            auto_deletion_date: body.auto_deletion_date,
            auto_deletion_policy: body.auto_deletion_policy,
            config: body.config.unwrap_or(defaults.default_room_config),
            roles: defaults.default_roles,
            anonymous,
            status: RoomStatus::Open,
            meeting_end_action: MeetingEndAction::None,
            permissions_updated_at: now,
        };

        self.repos.rooms().put(&room).await?;

        log::info!("Created room {}", room.room_id);

        Ok(room)
    }

    pub async fn get(&self, room_id: &RoomId) -> ApiResult<Room> {
        self.repos
            .rooms()
            .get(room_id)
            .await?
            .ok_or_else(|| ApiError::not_found().into())
    }

    /// List one page of rooms, optionally filtered by name substring.
    pub async fn list(&self, query: &GetRoomsQuery) -> ApiResult<(Vec<Room>, Option<String>)> {
        let max_items = query.max_items.unwrap_or(50).min(100);

        let (mut rooms, next) = self
            .repos
            .rooms()
            .list(max_items, query.next_page_token.as_deref())
            .await?;

        if let Some(filter) = &query.room_name {
            let needle = filter.to_lowercase();
            rooms.retain(|room| room.room_name.to_lowercase().contains(&needle));
        }

        Ok((rooms, next))
    }

    /// Replace the feature toggles.
    ///
    /// Does not touch roles, permissions or anonymous access, so
    /// outstanding member tokens stay valid.
    pub async fn update_config(
        &self,
        room_id: &RoomId,
        config: ovmeet_types::rooms::RoomConfig,
    ) -> ApiResult<Room> {
        let rooms = self.repos.rooms();

        let mut room = self.get(room_id).await?;
        room.config = config;
        rooms.put(&room).await?;

        Ok(room)
    }

    /// Explicit status update; only `open ↔ closed` is allowed.
    pub async fn update_status(&self, room_id: &RoomId, status: RoomStatus) -> ApiResult<Room> {
        if status == RoomStatus::ActiveMeeting {
            return Err(ApiError::unprocessable_entities([ValidationErrorEntry {
                field: Some("status".into()),
                code: "invalid_value".into(),
                message: Some("Only open and closed can be set explicitly".into()),
            }])
            .into());
        }

        let _ = self.get(room_id).await?;

        let room = self
            .repos
            .rooms()
            .update_if_status(room_id, &[RoomStatus::Open, RoomStatus::Closed], |room| {
                room.status = status;
            })
            .await
            .map_err(|e| match e {
                StorageError::UpdateConflict { .. } => ApiError::conflict()
                    .with_message("The room status cannot be changed while a meeting is active")
                    .into(),
                other => crate::CaptureApiError::from(other),
            })?;

        Ok(room)
    }

    /// Replace the role templates.
    ///
    /// Bumps every permissions epoch touched by the templates: the room
    /// record, the anonymous entries and all member snapshots. Previously
    /// minted member tokens become invalid.
    pub async fn update_roles(
        &self,
        room_id: &RoomId,
        roles: BTreeMap<RoomRole, PermissionSet>,
    ) -> ApiResult<Room> {
        let rooms = self.repos.rooms();
        let now = Utc::now();

        let mut room = self.get(room_id).await?;
        room.roles = roles;
        room.permissions_updated_at = now;
        for entry in room.anonymous.roles.values_mut() {
            entry.permissions_updated_at = now;
        }
        rooms.put(&room).await?;

        // Re-materialise the member snapshots on the new templates.
        let members = self.repos.members();
        let (room_members, _) = members.list(room_id, 100, None).await?;
        for mut member in room_members {
            member.effective_permissions = resolve_effective_permissions(
                &room,
                member.base_role,
                member.custom_permissions.as_ref(),
            );
            member.permissions_updated_at = now;
            members.put(&member).await?;

            self.bus.broadcast(&SystemEvent::MemberPermissionsChanged {
                room_id: room_id.clone(),
                member_id: member.member_id.clone(),
            });
        }

        Ok(room)
    }

    /// Update the anonymous access toggles.
    ///
    /// Newly enabled roles get a fresh secret and access URL; every
    /// touched entry gets a new permissions epoch, invalidating
    /// outstanding anonymous tokens for that role.
    pub async fn update_anonymous(
        &self,
        room_id: &RoomId,
        toggles: BTreeMap<RoomRole, AnonymousRoleToggle>,
    ) -> ApiResult<Room> {
        let rooms = self.repos.rooms();

        let mut room = self.get(room_id).await?;
        room.anonymous = self.materialize_anonymous(room_id, toggles, room.anonymous.clone());
        rooms.put(&room).await?;

        Ok(room)
    }

    /// Apply a deletion request per the policy decision table.
    pub async fn delete(
        &self,
        room_id: &RoomId,
        with_meeting: WithMeetingPolicy,
        with_recordings: WithRecordingsPolicy,
    ) -> ApiResult<DeletionOutcome> {
        let room = self.get(room_id).await?;

        let has_recordings = self.repos.recordings().any_for_room(room_id).await?;

        let plan = decide_deletion(
            room.has_active_meeting(),
            has_recordings,
            with_meeting,
            with_recordings,
        );

        self.execute_plan(room, plan).await
    }

    /// Apply a deletion request to every id, aggregating the outcomes.
    ///
    /// Returns `true` when every room was processed successfully.
    pub async fn bulk_delete(
        &self,
        room_ids: &[String],
        with_meeting: WithMeetingPolicy,
        with_recordings: WithRecordingsPolicy,
    ) -> ApiResult<(bool, BulkDeleteRoomsResponseBody)> {
        let mut successful = Vec::new();
        let mut failed = Vec::new();
        let mut seen = std::collections::BTreeSet::new();

        for raw in room_ids {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let Ok(room_id) = RoomId::parse(raw) else {
                failed.push(FailedRoomDeletion {
                    room_id: raw.to_owned(),
                    error: "invalid_room_id".into(),
                    message: "The room id is not valid".into(),
                });
                continue;
            };

            // Duplicates are deduplicated after sanitisation
            if !seen.insert(room_id.clone()) {
                continue;
            }

            match self.delete(&room_id, with_meeting, with_recordings).await {
                Ok(outcome) if outcome.code.is_success() => successful.push(room_id),
                Ok(outcome) => failed.push(FailedRoomDeletion {
                    room_id: room_id.to_string(),
                    error: outcome.code.as_ref().to_owned(),
                    message: outcome.message(),
                }),
                Err(e) => {
                    let api_error = e.as_api_error();
                    failed.push(FailedRoomDeletion {
                        room_id: room_id.to_string(),
                        error: api_error.code().to_owned(),
                        message: api_error.to_string(),
                    });
                }
            }
        }

        let all_ok = failed.is_empty();

        Ok((all_ok, BulkDeleteRoomsResponseBody { successful, failed }))
    }

    /// `room_started` webhook: first participant joined.
    pub async fn on_media_room_started(&self, room_id: &RoomId) -> ApiResult<()> {
        if self.repos.rooms().get(room_id).await?.is_none() {
            log::warn!("Ignoring room_started for unknown room {room_id}");
            return Ok(());
        }

        match self
            .repos
            .rooms()
            .update_if_status(room_id, &[RoomStatus::Open], |room| {
                room.status = RoomStatus::ActiveMeeting;
            })
            .await
        {
            Ok(_) => {
                self.bus.broadcast(&SystemEvent::MeetingStarted {
                    room_id: room_id.clone(),
                });
            }
            Err(StorageError::UpdateConflict { .. }) => {
                // Already active or closed; the handler is idempotent
                log::debug!("room_started for {room_id} left the status unchanged");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    /// `room_finished` webhook or status-consistency GC: the meeting is
    /// gone; consume the deferred action exactly once.
    pub async fn on_media_room_finished(&self, room_id: &RoomId) -> ApiResult<()> {
        let Some(room) = self.repos.rooms().get(room_id).await? else {
            log::warn!("Ignoring room_finished for unknown room {room_id}");
            return Ok(());
        };

        if room.status == RoomStatus::ActiveMeeting {
            let action = room.meeting_end_action;
            let unfinished = self.has_unfinished_recordings(room_id).await?;

            match action {
                MeetingEndAction::None => {
                    self.reopen(room_id).await?;
                }
                MeetingEndAction::Close | MeetingEndAction::Delete if unfinished => {
                    // A recording is still finalising; keep the deferred
                    // action pending until its egress_ended arrives.
                    self.reopen_keeping_action(room_id).await?;
                }
                MeetingEndAction::Close => {
                    let _ = self
                        .repos
                        .rooms()
                        .update_if_status(room_id, &[RoomStatus::ActiveMeeting], |room| {
                            room.status = RoomStatus::Closed;
                            room.meeting_end_action = MeetingEndAction::None;
                        })
                        .await;
                }
                MeetingEndAction::Delete => {
                    self.cascade_delete(room, true).await?;
                }
            }

            self.bus.broadcast(&SystemEvent::MeetingEnded {
                room_id: room_id.clone(),
            });
        }

        // Release any recording lock the meeting left behind
        let lock_name = LockName::RecordingActive(room_id.clone()).to_string();
        match self.locks.force_release(&lock_name).await {
            Ok(true) => log::debug!("Released stale {lock_name} after meeting end"),
            Ok(false) => {}
            Err(e) => log::warn!("Failed to release {lock_name}: {e}"),
        }

        Ok(())
    }

    /// Run a pending deferred action once the room has no meeting and no
    /// unfinished recordings. Called after every `egress_ended`.
    pub async fn consume_deferred_if_ready(&self, room_id: &RoomId) -> ApiResult<()> {
        let Some(room) = self.repos.rooms().get(room_id).await? else {
            return Ok(());
        };

        if room.status == RoomStatus::ActiveMeeting
            || room.meeting_end_action == MeetingEndAction::None
            || self.has_unfinished_recordings(room_id).await?
        {
            return Ok(());
        }

        match room.meeting_end_action {
            MeetingEndAction::Close => {
                let _ = self
                    .repos
                    .rooms()
                    .update_if_status(room_id, &[RoomStatus::Open, RoomStatus::Closed], |room| {
                        room.status = RoomStatus::Closed;
                        room.meeting_end_action = MeetingEndAction::None;
                    })
                    .await;
                Ok(())
            }
            MeetingEndAction::Delete => self.cascade_delete(room, true).await,
            MeetingEndAction::None => Ok(()),
        }
    }

    /// Expiration GC: apply the auto deletion policy of overdue rooms.
    pub async fn expiration_gc(&self) {
        let now = Utc::now();
        let mut cursor: Option<String> = None;

        loop {
            let page = match self.repos.rooms().list(100, cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    log::warn!("Room expiration GC could not list rooms: {e}");
                    return;
                }
            };

            for room in page.0 {
                let Some(deadline) = room.auto_deletion_date else {
                    continue;
                };
                if deadline > now {
                    continue;
                }

                let policy = room.auto_deletion_policy.unwrap_or_default();

                match self
                    .delete(&room.room_id, policy.with_meeting, policy.with_recordings)
                    .await
                {
                    Ok(outcome) if outcome.code.is_success() => {
                        log::info!(
                            "Expiration GC processed room {}: {}",
                            room.room_id,
                            outcome.code
                        );
                    }
                    Ok(outcome) => {
                        log::warn!(
                            "Expiration GC refused to delete room {}: {}",
                            room.room_id,
                            outcome.code
                        );
                    }
                    Err(e) => {
                        log::warn!("Expiration GC failed for room {}: {e}", room.room_id);
                    }
                }
            }

            match page.1 {
                Some(next) => cursor = Some(next),
                None => return,
            }
        }
    }

    /// Status-consistency GC: rooms marked `active_meeting` whose media
    /// room is gone are driven through the `room_finished` transition.
    pub async fn status_consistency_gc(&self) {
        let mut cursor: Option<String> = None;

        loop {
            let page = match self.repos.rooms().list(100, cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    log::warn!("Status-consistency GC could not list rooms: {e}");
                    return;
                }
            };

            for room in page.0 {
                if room.status != RoomStatus::ActiveMeeting {
                    continue;
                }

                match self.media.room_exists(&room.room_id).await {
                    Ok(true) => {}
                    Ok(false) => {
                        log::info!(
                            "Room {} has no media room, driving the meeting-end transition",
                            room.room_id
                        );
                        if let Err(e) = self.on_media_room_finished(&room.room_id).await {
                            log::warn!(
                                "Status-consistency GC failed for room {}: {e}",
                                room.room_id
                            );
                        }
                    }
                    Err(e) => {
                        // The check itself failed; leave the room alone
                        log::warn!(
                            "Status-consistency GC could not check room {}: {e}",
                            room.room_id
                        );
                    }
                }
            }

            match page.1 {
                Some(next) => cursor = Some(next),
                None => return,
            }
        }
    }

    async fn execute_plan(&self, room: Room, plan: DeletionPlan) -> ApiResult<DeletionOutcome> {
        let room_id = room.room_id.clone();

        match plan {
            DeletionPlan::Delete {
                kick_meeting,
                delete_recordings,
                code,
            } => {
                if kick_meeting {
                    self.kick_media_room(&room_id).await?;
                }

                self.cascade_delete(room, delete_recordings).await?;

                Ok(DeletionOutcome {
                    status: StatusCode::OK,
                    code,
                    room: None,
                })
            }
            DeletionPlan::Close { kick_meeting, code } => {
                if kick_meeting {
                    self.kick_media_room(&room_id).await?;
                }

                let room = self
                    .repos
                    .rooms()
                    .update_if_status(
                        &room_id,
                        &[RoomStatus::Open, RoomStatus::ActiveMeeting, RoomStatus::Closed],
                        |room| {
                            room.status = RoomStatus::Closed;
                            room.meeting_end_action = MeetingEndAction::None;
                        },
                    )
                    .await?;

                Ok(DeletionOutcome {
                    status: StatusCode::OK,
                    code,
                    room: Some(room),
                })
            }
            DeletionPlan::Schedule { action, code } => {
                let room = self
                    .repos
                    .rooms()
                    .update_if_status(&room_id, &[RoomStatus::ActiveMeeting], |room| {
                        room.meeting_end_action = action;
                    })
                    .await
                    .map_err(|e| match e {
                        // The meeting ended while deciding; ask the caller
                        // to retry against the new state.
                        StorageError::UpdateConflict { .. } => {
                            crate::CaptureApiError::from(ApiError::conflict().with_message(
                                "The meeting ended while scheduling, retry the request",
                            ))
                        }
                        other => other.into(),
                    })?;

                Ok(DeletionOutcome {
                    status: StatusCode::ACCEPTED,
                    code,
                    room: Some(room),
                })
            }
            DeletionPlan::Refuse { code } => Ok(DeletionOutcome {
                status: StatusCode::CONFLICT,
                code,
                room: Some(room),
            }),
        }
    }

    /// Delete the room document and everything it owns.
    async fn cascade_delete(&self, room: Room, delete_recordings: bool) -> ApiResult<()> {
        let room_id = room.room_id;

        if delete_recordings {
            let _ = self.repos.recordings().delete_all_for_room(&room_id).await?;
        }

        let _ = self.repos.members().delete_all(&room_id).await?;
        self.repos.rooms().delete(&room_id).await?;

        self.bus.broadcast(&SystemEvent::RoomDeleted {
            room_id: room_id.clone(),
        });

        log::info!("Deleted room {room_id}");

        Ok(())
    }

    async fn kick_media_room(&self, room_id: &RoomId) -> ApiResult<()> {
        match self.media.delete_room(room_id).await {
            Ok(()) => Ok(()),
            // The meeting may have ended on its own in the meantime
            Err(ovmeet_livekit::MediaError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn reopen(&self, room_id: &RoomId) -> ApiResult<()> {
        let _ = self
            .repos
            .rooms()
            .update_if_status(room_id, &[RoomStatus::ActiveMeeting], |room| {
                room.status = RoomStatus::Open;
                room.meeting_end_action = MeetingEndAction::None;
            })
            .await;

        Ok(())
    }

    async fn reopen_keeping_action(&self, room_id: &RoomId) -> ApiResult<()> {
        let _ = self
            .repos
            .rooms()
            .update_if_status(room_id, &[RoomStatus::ActiveMeeting], |room| {
                room.status = RoomStatus::Open;
            })
            .await;

        Ok(())
    }

    async fn has_unfinished_recordings(&self, room_id: &RoomId) -> ApiResult<bool> {
        let (recordings, _) = self.repos.recordings().list(Some(room_id), 100, None).await?;

        Ok(recordings
            .iter()
            .any(|recording| !recording.status.is_terminal()))
    }

    fn check_auto_deletion_date(
        &self,
        date: Option<&chrono::DateTime<Utc>>,
    ) -> Result<(), ApiError> {
        let Some(date) = date else { return Ok(()) };

        // Applies to creation and updates alike
        if *date < Utc::now() + self.config.min_auto_deletion_lead {
            return Err(ApiError::unprocessable_entities([ValidationErrorEntry {
                field: Some("autoDeletionDate".into()),
                code: "out_of_range".into(),
                message: Some(
                    format!(
                        "autoDeletionDate must lie at least {} minutes in the future",
                        self.config.min_auto_deletion_lead.num_minutes()
                    )
                    .into(),
                ),
            }]));
        }

        Ok(())
    }

    async fn generate_room_id(&self, room_name: &str) -> ApiResult<RoomId> {
        let prefix = sanitize_room_prefix(room_name);

        // The suffix space is large enough that collisions mean something
        // is wrong with the random source.
        for _ in 0..5 {
            let suffix: String = rand::rng()
                .sample_iter(rand::distr::Alphanumeric)
                .take(self.config.room_id_suffix_length)
                .map(|c| (c as char).to_ascii_lowercase())
                .collect();

            let candidate = RoomId::parse(format!("{prefix}-{suffix}"))
                .map_err(|_| ApiError::internal())?;

            if !self.repos.rooms().exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(ApiError::internal()
            .with_message("Could not generate a unique room id")
            .into())
    }

    fn materialize_anonymous(
        &self,
        room_id: &RoomId,
        toggles: BTreeMap<RoomRole, AnonymousRoleToggle>,
        mut current: AnonymousAccess,
    ) -> AnonymousAccess {
        let now = Utc::now();

        for (role, toggle) in toggles {
            match current.roles.get_mut(&role) {
                Some(entry) => {
                    entry.enabled = toggle.enabled;
                    entry.permissions_updated_at = now;
                }
                None if toggle.enabled => {
                    let secret: String = rand::rng()
                        .sample_iter(rand::distr::Alphanumeric)
                        .take(32)
                        .map(char::from)
                        .collect();

                    let _ = current.roles.insert(
                        role,
                        AnonymousRoleAccess {
                            enabled: true,
                            access_url: anonymous_access_url(
                                &self.config.public_url,
                                room_id,
                                &secret,
                            ),
                            secret,
                            permissions_updated_at: now,
                        },
                    );
                }
                None => {}
            }
        }

        current
    }
}

fn anonymous_access_url(public_url: &Url, room_id: &RoomId, secret: &str) -> Url {
    let mut url = public_url.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .expect("public_url is always a base URL");
        let _ = segments.pop_if_empty().push(room_id.as_str());
    }
    url.set_query(Some(&format!("secret={secret}")));

    url
}

/// Sanitise a room name into the id prefix.
///
/// Unicode-normalises, lowercases, maps whitespace and hyphens to `_`,
/// keeps `[a-z0-9_]`, collapses runs of `_` and trims them at the ends.
pub(crate) fn sanitize_room_prefix(room_name: &str) -> String {
    let mut prefix = String::with_capacity(room_name.len());
    let mut last_was_underscore = true;

    for c in room_name.nfkd().flat_map(char::to_lowercase) {
        let mapped = if c.is_whitespace() || c == '-' {
            Some('_')
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            Some(c)
        } else {
            None
        };

        if let Some(mapped) = mapped {
            if mapped == '_' && last_was_underscore {
                continue;
            }
            prefix.push(mapped);
            last_was_underscore = mapped == '_';
        }
    }

    while prefix.ends_with('_') {
        let _ = prefix.pop();
    }

    if prefix.is_empty() {
        "room".to_owned()
    } else {
        prefix
    }
}

fn deletion_message(code: RoomDeletionCode) -> &'static str {
    use RoomDeletionCode as Code;

    match code {
        Code::RoomDeleted => "The room was deleted",
        Code::RoomAndRecordingsDeleted => "The room and its recordings were deleted",
        Code::RoomClosed => "The room was closed, its recordings were kept",
        Code::RoomHasRecordings => "The room has recordings",
        Code::RoomWithActiveMeetingDeleted => "The room and its running meeting were deleted",
        Code::RoomScheduledToBeDeleted => {
            "The room will be deleted when the current meeting ends"
        }
        Code::RoomHasActiveMeeting => "The room has an active meeting",
        Code::RoomWithActiveMeetingAndRecordingsDeleted => {
            "The room, its running meeting and its recordings were deleted"
        }
        Code::RoomWithActiveMeetingClosed => {
            "The meeting was ended and the room was closed, its recordings were kept"
        }
        Code::RoomWithActiveMeetingHasRecordings => "The room has recordings",
        Code::RoomAndRecordingsScheduledToBeDeleted => {
            "The room and its recordings will be deleted when the current meeting ends"
        }
        Code::RoomScheduledToBeClosed => {
            "The room will be closed when the current meeting ends"
        }
        Code::RoomHasRecordingsCannotScheduleDeletion => {
            "The room has recordings, the deferred deletion was not scheduled"
        }
        Code::RoomWithRecordingsHasActiveMeeting => {
            "The room has recordings and an active meeting"
        }
    }
}
