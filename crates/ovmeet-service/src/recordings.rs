// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Recording lifecycle: start/stop coordination, deletion, streaming reads
//! and the orphaned-lock garbage collector.

use std::sync::Arc;

use chrono::Utc;
use ovmeet_exchange::{EventBus, SystemEvent, Topic};
use ovmeet_livekit::{EgressDescriptor, EgressState, FileOutputParams, MediaAdapter, MediaError};
use ovmeet_lock::{LockManager, LockName};
use ovmeet_storage::{ObjectBody, Repositories};
use ovmeet_types::{
    api::{
        error::ApiError,
        recordings::{BulkDeleteRecordingsResponseBody, FailedRecordingDeletion},
    },
    recordings::{
        EgressId, Recording, RecordingEncoding, RecordingErrorCode, RecordingId, RecordingStatus,
    },
    rooms::RoomId,
};
use rand::Rng as _;
use url::Url;

use crate::{ApiResult, ServiceConfig};

/// Default window served for an open-ended range request.
const RANGE_WINDOW: u64 = 5 * 1024 * 1024;

/// A (partial) recording read ready for streaming.
pub struct StreamedRecording {
    pub file_size: u64,
    pub start: u64,
    pub end: u64,
    /// Whether this is a partial (206) response.
    pub partial: bool,
    pub body: ObjectBody,
}

/// Recording lifecycle coordination.
#[derive(Clone)]
pub struct RecordingService {
    repos: Repositories,
    media: Arc<dyn MediaAdapter>,
    locks: Arc<dyn LockManager>,
    bus: EventBus,
    config: ServiceConfig,
}

impl RecordingService {
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

    /// Start a recording in the room.
    ///
    /// The whole path runs inside the `recording_active_{roomId}` critical
    /// section: the lock is taken before the egress starts and stays held
    /// until the `egress_ended` webhook releases it. On every error path
    /// taken here the lock is released inline.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, room_id: &RoomId) -> ApiResult<Recording> {
        if self.repos.rooms().get(room_id).await?.is_none() {
            return Err(ApiError::not_found().into());
        }

        match self.media.get_room(room_id).await {
            Ok(room) if room.num_participants > 0 => {}
            Ok(_) | Err(MediaError::NotFound) => {
                return Err(ApiError::conflict()
                    .with_code(RecordingErrorCode::RoomHasNoParticipants.as_str())
                    .with_message("The room has no participants to record")
                    .into());
            }
            Err(e) => return Err(e.into()),
        }

        let lock_name = LockName::RecordingActive(room_id.clone());
        let Some(lock) = self
            .locks
            .acquire(&lock_name, self.config.recording_lock_ttl)
            .await?
        else {
            return Err(ApiError::conflict()
                .with_code(RecordingErrorCode::RecordingAlreadyStarted.as_str())
                .with_message("A recording is already running in the room")
                .into());
        };

        match self.start_locked(room_id).await {
            Ok(recording) => Ok(recording),
            Err(e) => {
                if let Err(release_error) = self.locks.release(lock).await {
                    log::warn!(
                        "Failed to release {lock_name} after aborted recording start: {release_error}"
                    );
                }
                Err(e)
            }
        }
    }

    async fn start_locked(&self, room_id: &RoomId) -> ApiResult<Recording> {
        // Subscribe before starting the egress so the confirmation cannot
        // slip past us.
        let mut confirmation = self.bus.subscribe(&[Topic::RecordingActive]);

        let uid: String = rand::rng()
            .sample_iter(rand::distr::Alphanumeric)
            .take(10)
            .map(|c| (c as char).to_ascii_lowercase())
            .collect();

        let encoding = RecordingEncoding::default();
        let storage_path = format!(
            "recordings/{room_id}/{room_id}--{uid}.{}",
            encoding.container
        );

        let egress = self
            .media
            .start_room_composite(
                room_id,
                FileOutputParams {
                    filepath: storage_path.clone(),
                    layout: "grid".to_owned(),
                    audio_only: false,
                },
            )
            .await?;

        let recording_id = RecordingId::new(room_id.clone(), egress.egress_id.clone(), uid);

        let recording = Recording {
            recording_id: recording_id.clone(),
            room_id: room_id.clone(),
            status: RecordingStatus::Starting,
            size: 0,
            duration: 0.0,
            started_at: Utc::now(),
            ended_at: None,
            storage_path,
            encoding,
        };
        self.repos.recordings().put(&recording).await?;

        log::info!("Started recording {recording_id}");

        let confirmed = EventBus::wait_on_subscription(
            &mut confirmation,
            Topic::RecordingActive,
            |event| {
                matches!(
                    event,
                    SystemEvent::RecordingActive { recording_id: id, .. } if *id == recording_id
                )
            },
            self.config.recording_start_timeout,
        )
        .await;

        match confirmed {
            Ok(_) => Ok(self
                .repos
                .recordings()
                .get(&recording_id)
                .await?
                .unwrap_or(recording)),
            Err(_) => {
                log::warn!(
                    "Recording {recording_id} was not confirmed within {:?}, stopping",
                    self.config.recording_start_timeout
                );

                if let Err(e) = self.media.stop_egress(&egress.egress_id).await {
                    log::warn!("Best-effort stop of {} failed: {e}", egress.egress_id);
                }

                let mut aborted = recording;
                aborted.status = RecordingStatus::Aborted;
                aborted.ended_at = Some(Utc::now());
                self.repos.recordings().put(&aborted).await?;

                Err(ApiError::internal()
                    .with_code(RecordingErrorCode::RecordingStartTimeout.as_str())
                    .with_message("The recording did not become active in time")
                    .into())
            }
        }
    }

    /// Stop a running recording.
    ///
    /// The `recording_active` lock is released by the `egress_ended`
    /// webhook, not here, so start/stop stays correct across replicas.
    /// The start path's pending confirmation resolves through the same
    /// event stream.
    pub async fn stop(&self, recording_id: &RecordingId) -> ApiResult<Recording> {
        let egress = match self
            .media
            .get_egress(&recording_id.room_id, &recording_id.egress_id)
            .await
        {
            Ok(egress) => egress,
            Err(MediaError::NotFound) => return Err(ApiError::not_found().into()),
            Err(e) => return Err(e.into()),
        };

        match egress.status {
            EgressState::Active => {
                let _ = self.media.stop_egress(&recording_id.egress_id).await?;
            }
            EgressState::Starting => {
                return Err(ApiError::conflict()
                    .with_code(RecordingErrorCode::CannotBeStoppedWhileStarting.as_str())
                    .with_message("The recording is still starting")
                    .into());
            }
            _ => {
                return Err(ApiError::conflict()
                    .with_code(RecordingErrorCode::AlreadyStopped.as_str())
                    .with_message("The recording is not running")
                    .into());
            }
        }

        let recordings = self.repos.recordings();

        let recording = match recordings.get(recording_id).await? {
            Some(mut recording) => {
                if !recording.status.is_terminal() {
                    recording.status = RecordingStatus::Ending;
                    recordings.put(&recording).await?;
                }
                recording
            }
            None => return Err(ApiError::not_found().into()),
        };

        Ok(recording)
    }

    pub async fn get(&self, recording_id: &RecordingId) -> ApiResult<Recording> {
        self.repos
            .recordings()
            .get(recording_id)
            .await?
            .ok_or_else(|| ApiError::not_found().into())
    }

    pub async fn list(
        &self,
        room_id: Option<&RoomId>,
        max_items: u32,
        cursor: Option<&str>,
    ) -> ApiResult<(Vec<Recording>, Option<String>)> {
        Ok(self
            .repos
            .recordings()
            .list(room_id, max_items.min(100), cursor)
            .await?)
    }

    /// Delete a recording's artefacts.
    ///
    /// Requires a terminal status. When this was the last artefact under
    /// the room's metadata directory, the secrets manifest goes with it.
    pub async fn delete(&self, recording_id: &RecordingId) -> ApiResult<()> {
        let recording = self.get(recording_id).await?;

        if !recording.status.is_terminal() {
            return Err(ApiError::conflict()
                .with_code(RecordingErrorCode::NotStopped.as_str())
                .with_message("The recording must be stopped before it can be deleted")
                .into());
        }

        let recordings = self.repos.recordings();

        self.repos
            .store()
            .delete(&recording.storage_path)
            .await
            .map_err(ovmeet_storage::StorageError::from)?;
        recordings.delete_metadata(recording_id).await?;

        if !recordings.any_for_room(&recording.room_id).await? {
            recordings.delete_secrets(&recording.room_id).await?;
        }

        log::info!("Deleted recording {recording_id}");

        Ok(())
    }

    /// Delete several recordings, aggregating the outcomes.
    pub async fn bulk_delete(
        &self,
        recording_ids: &[String],
    ) -> ApiResult<(bool, BulkDeleteRecordingsResponseBody)> {
        let mut deleted = Vec::new();
        let mut not_deleted = Vec::new();
        let mut seen = std::collections::BTreeSet::new();

        for raw in recording_ids {
            let raw = raw.trim();
            if raw.is_empty() || !seen.insert(raw.to_owned()) {
                continue;
            }

            let Ok(recording_id) = RecordingId::parse(raw) else {
                not_deleted.push(FailedRecordingDeletion {
                    recording_id: raw.to_owned(),
                    error: "invalid_recording_id".into(),
                });
                continue;
            };

            match self.delete(&recording_id).await {
                Ok(()) => deleted.push(raw.to_owned()),
                Err(e) => not_deleted.push(FailedRecordingDeletion {
                    recording_id: raw.to_owned(),
                    error: e.as_api_error().code().to_owned(),
                }),
            }
        }

        let all_ok = not_deleted.is_empty();

        Ok((
            all_ok,
            BulkDeleteRecordingsResponseBody {
                deleted,
                not_deleted,
            },
        ))
    }

    /// Stream the recording media, optionally a byte range of it.
    pub async fn get_as_stream(
        &self,
        recording_id: &RecordingId,
        range: Option<&str>,
    ) -> ApiResult<StreamedRecording> {
        let recording = self.get(recording_id).await?;

        if recording.status != RecordingStatus::Complete {
            return Err(ApiError::not_found()
                .with_message("The recording has no readable media file")
                .into());
        }

        let store = self.repos.store();

        let file_size = store
            .size_if_exists(&recording.storage_path)
            .await
            .map_err(ovmeet_storage::StorageError::from)?
            .ok_or_else(ApiError::not_found)?;

        let (start, end, partial) = match range {
            Some(range) => {
                let (start, end) = parse_range(range, file_size)?;
                (start, end, true)
            }
            None => (0, file_size.saturating_sub(1), false),
        };

        let read = store
            .get_range(&recording.storage_path, start, end)
            .await
            .map_err(ovmeet_storage::StorageError::from)?;

        Ok(StreamedRecording {
            file_size: read.file_size,
            start: read.start,
            end: read.end,
            partial,
            body: read.body,
        })
    }

    /// Shareable media URL embedding the recording's access secret.
    pub async fn get_url(&self, recording_id: &RecordingId) -> ApiResult<Url> {
        let recording = self.get(recording_id).await?;

        if recording.status != RecordingStatus::Complete {
            return Err(ApiError::not_found()
                .with_message("The recording has no readable media file")
                .into());
        }

        let recordings = self.repos.recordings();

        let mut manifest = recordings
            .get_secrets(&recording.room_id)
            .await?
            .unwrap_or_default();

        let secret = match manifest.secrets.get(&recording_id.uid) {
            Some(secret) => secret.clone(),
            None => {
                let secret: String = rand::rng()
                    .sample_iter(rand::distr::Alphanumeric)
                    .take(32)
                    .map(char::from)
                    .collect();

                let _ = manifest
                    .secrets
                    .insert(recording_id.uid.clone(), secret.clone());
                recordings.put_secrets(&recording.room_id, &manifest).await?;

                secret
            }
        };

        let id = recording_id.to_string();
        let mut url = self.config.public_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ApiError::internal())?;
            let _ = segments
                .pop_if_empty()
                .extend(["api", "v1", "recordings", id.as_str(), "media"]);
        }
        url.set_query(Some(&format!("secret={secret}")));

        Ok(url)
    }

    /// Whether `secret` grants media access to the recording.
    pub async fn verify_media_secret(
        &self,
        recording_id: &RecordingId,
        secret: &str,
    ) -> ApiResult<bool> {
        Ok(self
            .repos
            .recordings()
            .get_secrets(&recording_id.room_id)
            .await?
            .is_some_and(|manifest| manifest.grants(&recording_id.uid, secret)))
    }

    /// `egress_started` webhook: the media server confirmed the recording.
    pub async fn on_egress_started(&self, egress: &EgressDescriptor) -> ApiResult<()> {
        let Ok(room_id) = RoomId::parse(&egress.room_name) else {
            log::warn!("Ignoring egress_started for unknown room {}", egress.room_name);
            return Ok(());
        };

        if !self
            .locks
            .exists(&LockName::RecordingActive(room_id.clone()))
            .await?
        {
            // The lock may have expired while the egress spun up; keep
            // processing, the metadata is the source of truth.
            log::warn!("egress_started for {room_id} without a recording_active lock");
        }

        let Some(mut recording) = self.find_by_egress(&room_id, &egress.egress_id).await? else {
            log::warn!(
                "Ignoring egress_started for unknown recording {} in room {room_id}",
                egress.egress_id
            );
            return Ok(());
        };

        // Idempotent: only the starting -> active transition writes
        if recording.status == RecordingStatus::Starting {
            recording.status = RecordingStatus::Active;
            self.repos.recordings().put(&recording).await?;
        }

        self.bus.broadcast(&SystemEvent::RecordingActive {
            room_id,
            recording_id: recording.recording_id.clone(),
        });

        Ok(())
    }

    /// `egress_updated` webhook: refresh the byte counters.
    pub async fn on_egress_updated(&self, egress: &EgressDescriptor) -> ApiResult<()> {
        if matches!(
            egress.status,
            EgressState::Complete | EgressState::Failed | EgressState::Aborted
        ) {
            return self.on_egress_ended(egress).await;
        }

        let Ok(room_id) = RoomId::parse(&egress.room_name) else {
            return Ok(());
        };

        let Some(mut recording) = self.find_by_egress(&room_id, &egress.egress_id).await? else {
            return Ok(());
        };

        if !recording.status.is_terminal() {
            recording.size = egress.size;
            recording.duration = egress.duration_secs as f64;
            self.repos.recordings().put(&recording).await?;
        }

        Ok(())
    }

    /// `egress_ended` webhook: terminal transition, lock release and
    /// secrets bookkeeping.
    pub async fn on_egress_ended(&self, egress: &EgressDescriptor) -> ApiResult<()> {
        let Ok(room_id) = RoomId::parse(&egress.room_name) else {
            log::warn!("Ignoring egress_ended for unknown room {}", egress.room_name);
            return Ok(());
        };

        let status = match egress.status {
            EgressState::Complete => RecordingStatus::Complete,
            EgressState::Aborted => RecordingStatus::Aborted,
            _ => RecordingStatus::Failed,
        };

        let Some(mut recording) = self.find_by_egress(&room_id, &egress.egress_id).await? else {
            log::warn!(
                "Ignoring egress_ended for unknown recording {} in room {room_id}",
                egress.egress_id
            );
            self.release_recording_lock(&room_id).await;
            return Ok(());
        };

        if !recording.status.is_terminal() {
            recording.status = status;
            recording.size = egress.size;
            recording.duration = egress.duration_secs as f64;
            recording.ended_at = Some(Utc::now());
            self.repos.recordings().put(&recording).await?;

            match status {
                RecordingStatus::Complete => {
                    let mut manifest = self
                        .repos
                        .recordings()
                        .get_secrets(&room_id)
                        .await?
                        .unwrap_or_default();

                    if !manifest.secrets.contains_key(&recording.recording_id.uid) {
                        let secret: String = rand::rng()
                            .sample_iter(rand::distr::Alphanumeric)
                            .take(32)
                            .map(char::from)
                            .collect();
                        let _ = manifest
                            .secrets
                            .insert(recording.recording_id.uid.clone(), secret);
                        self.repos.recordings().put_secrets(&room_id, &manifest).await?;
                    }
                }
                RecordingStatus::Aborted => {
                    // Aborted runs never produced a usable file
                    if let Err(e) = self.repos.store().delete(&recording.storage_path).await {
                        log::warn!(
                            "Failed to remove artefact of aborted recording {}: {e}",
                            recording.recording_id
                        );
                    }
                }
                _ => {}
            }

            self.bus.broadcast(&SystemEvent::RecordingEnded {
                room_id: room_id.clone(),
                recording_id: recording.recording_id.clone(),
                status,
            });
        }

        self.release_recording_lock(&room_id).await;

        Ok(())
    }

    /// Orphaned-lock GC: release `recording_active` locks whose room has
    /// no in-progress egress.
    pub async fn orphan_lock_gc(&self) {
        let locks = match self
            .locks
            .find_by_prefix(LockName::RECORDING_ACTIVE_PREFIX)
            .await
        {
            Ok(locks) => locks,
            Err(e) => {
                log::warn!("Orphan-lock GC could not enumerate locks: {e}");
                return;
            }
        };

        let now = Utc::now();

        for lock in locks {
            // Freshly acquired locks get a grace period; the egress may
            // not have reached the media server yet.
            if now.signed_duration_since(lock.acquired_at) < self.config.orphan_lock_grace {
                continue;
            }

            let Some(room_id) = LockName::recording_active_room(&lock.name) else {
                log::warn!("Orphan-lock GC found malformed lock name {}", lock.name);
                continue;
            };

            match self.media.in_progress_recordings(&room_id).await {
                Ok(egresses) if egresses.is_empty() => {
                    log::info!("Releasing orphaned lock {}", lock.name);
                    if let Err(e) = self.locks.force_release(&lock.name).await {
                        log::warn!("Failed to release orphaned lock {}: {e}", lock.name);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Orphan-lock GC could not check room {room_id}: {e}");
                }
            }
        }
    }

    async fn release_recording_lock(&self, room_id: &RoomId) {
        let lock_name = LockName::RecordingActive(room_id.clone()).to_string();

        match self.locks.force_release(&lock_name).await {
            Ok(_) => {}
            Err(e) => log::warn!("Failed to release {lock_name}: {e}"),
        }
    }

    async fn find_by_egress(
        &self,
        room_id: &RoomId,
        egress_id: &EgressId,
    ) -> ApiResult<Option<Recording>> {
        let (recordings, _) = self.repos.recordings().list(Some(room_id), 100, None).await?;

        Ok(recordings
            .into_iter()
            .find(|recording| &recording.recording_id.egress_id == egress_id))
    }
}

/// Parse a `bytes=start-end` range header against the file size.
///
/// An omitted end defaults to a 5 MiB window, capped at the end of the
/// file. Ranges starting beyond the file and malformed headers are
/// rejected with 416.
fn parse_range(header: &str, file_size: u64) -> Result<(u64, u64), ApiError> {
    let range = header
        .strip_prefix("bytes=")
        .ok_or_else(ApiError::range_not_satisfiable)?;

    let (start, end) = range
        .split_once('-')
        .ok_or_else(ApiError::range_not_satisfiable)?;

    let start: u64 = start
        .parse()
        .map_err(|_| ApiError::range_not_satisfiable())?;

    if start >= file_size {
        return Err(ApiError::range_not_satisfiable());
    }

    let end = if end.is_empty() {
        start + RANGE_WINDOW - 1
    } else {
        end.parse()
            .map_err(|_| ApiError::range_not_satisfiable())?
    };

    if end < start {
        return Err(ApiError::range_not_satisfiable());
    }

    Ok((start, end.min(file_size - 1)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use futures::TryStreamExt as _;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::{TestContext, test_room_with_meeting};

    fn room_id() -> RoomId {
        RoomId::parse("demo-xxxx").unwrap()
    }

    async fn ctx_with_meeting() -> TestContext {
        let ctx = TestContext::new().await;
        ctx.repos
            .rooms()
            .put(&test_room_with_meeting("demo-xxxx"))
            .await
            .unwrap();
        ctx.media.add_room(&room_id(), &["alice"]);
        ctx
    }

    /// Drive the start path to completion by replaying the
    /// `egress_started` webhook as soon as the egress appears.
    async fn start_confirmed(ctx: &TestContext) -> Recording {
        let recordings = ctx.recording_service();

        let start = {
            let recordings = recordings.clone();
            let room = room_id();
            tokio::spawn(async move { recordings.start(&room).await })
        };

        // Wait for the egress to be started on the mock media server.
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if !ctx.media.started_egresses().is_empty() {
                break;
            }
        }

        let egress = ctx.media.started_egresses().remove(0);
        recordings.on_egress_started(&egress).await.unwrap();

        start.await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn start_resolves_once_the_recording_is_active() {
        let ctx = ctx_with_meeting().await;

        let recording = start_confirmed(&ctx).await;

        assert!(
            recording.recording_id.to_string().starts_with("demo-xxxx--"),
            "unexpected id {}",
            recording.recording_id
        );
        assert_eq!(recording.status, RecordingStatus::Active);
        assert!(
            ctx.locks
                .exists(&LockName::RecordingActive(room_id()))
                .await
                .unwrap(),
            "the lock stays held until egress_ended"
        );
    }

    #[tokio::test]
    async fn concurrent_starts_have_exactly_one_winner() {
        let ctx = ctx_with_meeting().await;
        let recordings = ctx.recording_service();

        let second = recordings.clone();
        let (first, second) = tokio::join!(
            recordings.start(&room_id()),
            async move { second.start(&room_id()).await },
        );

        let results = [first, second];
        let already_started = results
            .iter()
            .filter(|result| {
                result
                    .as_ref()
                    .err()
                    .is_some_and(|e| e.as_api_error().code() == "RECORDING_ALREADY_STARTED")
            })
            .count();
        let timed_out = results
            .iter()
            .filter(|result| {
                result
                    .as_ref()
                    .err()
                    .is_some_and(|e| e.as_api_error().code() == "RECORDING_START_TIMEOUT")
            })
            .count();

        // The loser observes the lock; the winner (never confirmed by a
        // webhook in this test) times out.
        assert_eq!(already_started, 1, "exactly one start must lose the lock");
        assert_eq!(timed_out, 1);
    }

    #[tokio::test]
    async fn start_timeout_releases_the_lock() {
        let ctx = ctx_with_meeting().await;
        let recordings = ctx.recording_service();

        let err = recordings.start(&room_id()).await.unwrap_err();
        assert_eq!(err.as_api_error().code(), "RECORDING_START_TIMEOUT");

        assert!(
            !ctx.locks
                .exists(&LockName::RecordingActive(room_id()))
                .await
                .unwrap(),
            "no lock may remain after a start timeout"
        );

        // The aborted attempt is recorded as such
        let (recordings_meta, _) = ctx
            .repos
            .recordings()
            .list(Some(&room_id()), 10, None)
            .await
            .unwrap();
        assert_eq!(recordings_meta.len(), 1);
        assert_eq!(recordings_meta[0].status, RecordingStatus::Aborted);
    }

    #[tokio::test]
    async fn start_requires_participants() {
        let ctx = TestContext::new().await;
        ctx.repos
            .rooms()
            .put(&test_room_with_meeting("demo-xxxx"))
            .await
            .unwrap();
        ctx.media.add_room(&room_id(), &[]);

        let err = ctx.recording_service().start(&room_id()).await.unwrap_err();

        assert_eq!(err.as_api_error().code(), "ROOM_HAS_NO_PARTICIPANTS");
    }

    #[tokio::test]
    async fn start_requires_a_known_room() {
        let ctx = TestContext::new().await;

        let err = ctx.recording_service().start(&room_id()).await.unwrap_err();

        assert_eq!(err.as_api_error().status.as_u16(), 404);
    }

    #[tokio::test]
    async fn stop_branches_on_the_egress_status() {
        let ctx = ctx_with_meeting().await;
        let recordings = ctx.recording_service();

        let recording = start_confirmed(&ctx).await;
        let id = recording.recording_id.clone();

        // Still starting on the media server side
        ctx.media
            .set_egress_status(&id.egress_id, EgressState::Starting);
        let err = recordings.stop(&id).await.unwrap_err();
        assert_eq!(err.as_api_error().code(), "CANNOT_BE_STOPPED_WHILE_STARTING");

        // Active: stop succeeds
        ctx.media.set_egress_status(&id.egress_id, EgressState::Active);
        let stopped = recordings.stop(&id).await.unwrap();
        assert_eq!(stopped.status, RecordingStatus::Ending);

        // The mock marked the egress as ending
        let err = recordings.stop(&id).await.unwrap_err();
        assert_eq!(err.as_api_error().code(), "ALREADY_STOPPED");
    }

    #[tokio::test]
    async fn egress_ended_finalises_and_releases_the_lock() {
        let ctx = ctx_with_meeting().await;
        let recordings = ctx.recording_service();

        let recording = start_confirmed(&ctx).await;
        let id = recording.recording_id.clone();

        let ended = EgressDescriptor {
            egress_id: id.egress_id.clone(),
            room_name: "demo-xxxx".into(),
            status: EgressState::Complete,
            size: 4096,
            duration_secs: 120,
            error: None,
        };

        recordings.on_egress_ended(&ended).await.unwrap();

        let stored = recordings.get(&id).await.unwrap();
        assert_eq!(stored.status, RecordingStatus::Complete);
        assert_eq!(stored.size, 4096);
        assert!(stored.ended_at.is_some());

        assert!(
            !ctx.locks
                .exists(&LockName::RecordingActive(room_id()))
                .await
                .unwrap()
        );

        // The secrets manifest now grants access to the recording
        let manifest = ctx
            .repos
            .recordings()
            .get_secrets(&room_id())
            .await
            .unwrap()
            .unwrap();
        assert!(manifest.secrets.contains_key(&id.uid));
    }

    #[tokio::test]
    async fn delete_requires_a_terminal_status() {
        let ctx = ctx_with_meeting().await;
        let recordings = ctx.recording_service();

        let recording = start_confirmed(&ctx).await;
        let id = recording.recording_id.clone();

        let err = recordings.delete(&id).await.unwrap_err();
        assert_eq!(err.as_api_error().code(), "NOT_STOPPED");

        // Finish it, write the media file, then delete
        recordings
            .on_egress_ended(&EgressDescriptor {
                egress_id: id.egress_id.clone(),
                room_name: "demo-xxxx".into(),
                status: EgressState::Complete,
                size: 10,
                duration_secs: 1,
                error: None,
            })
            .await
            .unwrap();
        ctx.repos
            .store()
            .put(&recording.storage_path, Bytes::from_static(b"0123456789"))
            .await
            .unwrap();

        recordings.delete(&id).await.unwrap();

        assert!(recordings.get(&id).await.is_err());
        assert!(
            ctx.repos
                .store()
                .size_if_exists(&recording.storage_path)
                .await
                .unwrap()
                .is_none()
        );
        // Last artefact: the secrets manifest is gone too
        assert!(
            ctx.repos
                .recordings()
                .get_secrets(&room_id())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn ranged_streaming_serves_the_requested_bytes() {
        let ctx = ctx_with_meeting().await;
        let recordings = ctx.recording_service();

        let recording = start_confirmed(&ctx).await;
        let id = recording.recording_id.clone();

        recordings
            .on_egress_ended(&EgressDescriptor {
                egress_id: id.egress_id.clone(),
                room_name: "demo-xxxx".into(),
                status: EgressState::Complete,
                size: 10,
                duration_secs: 1,
                error: None,
            })
            .await
            .unwrap();
        ctx.repos
            .store()
            .put(&recording.storage_path, Bytes::from_static(b"0123456789"))
            .await
            .unwrap();

        let read = recordings
            .get_as_stream(&id, Some("bytes=2-5"))
            .await
            .unwrap();
        assert!(read.partial);
        assert_eq!((read.start, read.end, read.file_size), (2, 5, 10));

        let chunks: Vec<Bytes> = read.body.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"2345");

        let full = recordings.get_as_stream(&id, None).await.unwrap();
        assert!(!full.partial);
        assert_eq!((full.start, full.end), (0, 9));

        let err = recordings
            .get_as_stream(&id, Some("bytes=10-12"))
            .await
            .unwrap_err();
        assert_eq!(err.as_api_error().status.as_u16(), 416);
    }

    #[test]
    fn range_parsing_applies_the_default_window() {
        let file_size = 20 * 1024 * 1024;

        assert_eq!(parse_range("bytes=0-99", file_size).unwrap(), (0, 99));
        assert_eq!(
            parse_range("bytes=0-", file_size).unwrap(),
            (0, RANGE_WINDOW - 1)
        );
        // Open-ended near the end clamps to the file
        assert_eq!(
            parse_range("bytes=20971510-", file_size).unwrap(),
            (20971510, file_size - 1)
        );
        assert!(parse_range("bytes=5-2", file_size).is_err());
        assert!(parse_range("chunks=0-1", file_size).is_err());
        assert!(parse_range(&format!("bytes={file_size}-"), file_size).is_err());
    }

    #[tokio::test]
    async fn orphan_gc_releases_stale_locks_only() {
        // The test config sets the grace period to zero so freshly
        // acquired locks are already eligible.
        let ctx = TestContext::new().await;
        let recordings = ctx.recording_service();

        // Lock without any in-progress egress: released
        let stale_room = RoomId::parse("stale-1").unwrap();
        let _stale = ctx
            .locks
            .acquire(
                &LockName::RecordingActive(stale_room.clone()),
                Duration::from_secs(600),
            )
            .await
            .unwrap()
            .unwrap();

        // Lock with an in-progress egress: kept
        let busy_room = RoomId::parse("busy-1").unwrap();
        ctx.media.add_room(&busy_room, &["alice"]);
        ctx.media.insert_egress(EgressDescriptor {
            egress_id: EgressId::from("eg-busy".to_owned()),
            room_name: "busy-1".into(),
            status: EgressState::Active,
            size: 0,
            duration_secs: 0,
            error: None,
        });
        let _busy = ctx
            .locks
            .acquire(
                &LockName::RecordingActive(busy_room.clone()),
                Duration::from_secs(600),
            )
            .await
            .unwrap()
            .unwrap();

        recordings.orphan_lock_gc().await;

        assert!(
            !ctx.locks
                .exists(&LockName::RecordingActive(stale_room))
                .await
                .unwrap(),
            "orphaned locks are released within one GC run"
        );
        assert!(
            ctx.locks
                .exists(&LockName::RecordingActive(busy_room))
                .await
                .unwrap(),
            "locks with an in-progress egress are never released"
        );
    }

    #[tokio::test]
    async fn orphan_gc_spares_locks_within_the_grace_period() {
        let ctx = TestContext::new().await;

        let mut config = ctx.config.clone();
        config.orphan_lock_grace = chrono::Duration::minutes(1);

        let recordings = RecordingService::new(
            ctx.repos.clone(),
            ctx.media.clone(),
            ctx.locks.clone(),
            ctx.bus.clone(),
            config,
        );

        let young_room = RoomId::parse("young-1").unwrap();
        let _young = ctx
            .locks
            .acquire(
                &LockName::RecordingActive(young_room.clone()),
                Duration::from_secs(600),
            )
            .await
            .unwrap()
            .unwrap();

        recordings.orphan_lock_gc().await;

        assert!(
            ctx.locks
                .exists(&LockName::RecordingActive(young_room))
                .await
                .unwrap(),
            "locks younger than the grace period are never released"
        );
    }
}
