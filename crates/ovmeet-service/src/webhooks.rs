// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Dispatch of verified media-server webhooks into the services.

use std::{sync::Arc, time::Duration};

use ovmeet_livekit::{MediaWebhook, WebhookKind};
use ovmeet_lock::{LockManager, LockName};
use ovmeet_types::rooms::RoomId;

use crate::{ApiResult, RecordingService, RoomService};

/// TTL of the per-delivery dedup lock; it outlives the media server's
/// retry window.
const DEDUP_TTL: Duration = Duration::from_secs(30);

/// Validates, deduplicates and dispatches media-server webhooks.
///
/// Signature verification happens at the HTTP boundary; everything behind
/// it is idempotent, so processing failures are logged and the delivery is
/// acknowledged to avoid retry storms.
#[derive(Clone)]
pub struct WebhookSink {
    rooms: RoomService,
    recordings: RecordingService,
    locks: Arc<dyn LockManager>,
}

impl WebhookSink {
    pub fn new(
        rooms: RoomService,
        recordings: RecordingService,
        locks: Arc<dyn LockManager>,
    ) -> Self {
        Self {
            rooms,
            recordings,
            locks,
        }
    }

    /// Process one delivery. Duplicate deliveries are acknowledged without
    /// reprocessing.
    #[tracing::instrument(skip_all, fields(event = webhook.kind.as_event_name(), id = %webhook.id))]
    pub async fn process(&self, webhook: &MediaWebhook) -> ApiResult<()> {
        let dedup = LockName::Webhook {
            event: webhook.kind.as_event_name().to_owned(),
            id: webhook.id.clone(),
        };

        // The lock is never released; it expires after the media server's
        // retry window, deduplicating the delivery across replicas.
        match self.locks.acquire(&dedup, DEDUP_TTL).await {
            Ok(Some(_lock)) => {}
            Ok(None) => {
                log::debug!("Delivery {} already processed, acknowledging", webhook.id);
                return Ok(());
            }
            Err(e) => {
                // Without the lock store the delivery is processed anyway;
                // every handler is idempotent.
                log::warn!("Webhook dedup unavailable, processing delivery {}: {e}", webhook.id);
            }
        }

        if let Err(e) = self.route(webhook).await {
            log::error!(
                "Processing webhook {} ({}) failed: {e}",
                webhook.id,
                webhook.kind.as_event_name()
            );
        }

        Ok(())
    }

    async fn route(&self, webhook: &MediaWebhook) -> ApiResult<()> {
        match &webhook.kind {
            WebhookKind::RoomStarted => {
                let Some(room_id) = self.room_id(webhook) else {
                    return Ok(());
                };
                self.rooms.on_media_room_started(&room_id).await
            }
            WebhookKind::RoomFinished => {
                let Some(room_id) = self.room_id(webhook) else {
                    return Ok(());
                };
                self.rooms.on_media_room_finished(&room_id).await
            }
            WebhookKind::EgressStarted => {
                let Some(egress) = &webhook.egress else {
                    return Ok(());
                };
                self.recordings.on_egress_started(egress).await
            }
            WebhookKind::EgressUpdated => {
                let Some(egress) = &webhook.egress else {
                    return Ok(());
                };
                self.recordings.on_egress_updated(egress).await
            }
            WebhookKind::EgressEnded => {
                let Some(egress) = &webhook.egress else {
                    return Ok(());
                };

                self.recordings.on_egress_ended(egress).await?;

                // The last finishing recording may unblock a deferred
                // room deletion/closure.
                if let Ok(room_id) = RoomId::parse(&egress.room_name) {
                    self.rooms.consume_deferred_if_ready(&room_id).await?;
                }

                Ok(())
            }
            WebhookKind::Other(name) => {
                log::debug!("Acknowledging unhandled webhook event {name}");
                Ok(())
            }
        }
    }

    fn room_id(&self, webhook: &MediaWebhook) -> Option<RoomId> {
        let name = webhook.room_name.as_deref()?;

        match RoomId::parse(name) {
            Ok(room_id) => Some(room_id),
            Err(_) => {
                log::warn!("Webhook {} references malformed room {name}", webhook.id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ovmeet_exchange::Topic;
    use ovmeet_livekit::{EgressDescriptor, EgressState};
    use ovmeet_types::rooms::{MeetingEndAction, RoomStatus};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_util::{TestContext, test_room, test_room_with_meeting};

    fn room_id(id: &str) -> RoomId {
        RoomId::parse(id).unwrap()
    }

    fn room_started(id: &str, delivery: &str) -> MediaWebhook {
        MediaWebhook {
            kind: WebhookKind::RoomStarted,
            id: delivery.to_owned(),
            room_name: Some(id.to_owned()),
            egress: None,
        }
    }

    fn room_finished(id: &str, delivery: &str) -> MediaWebhook {
        MediaWebhook {
            kind: WebhookKind::RoomFinished,
            id: delivery.to_owned(),
            room_name: Some(id.to_owned()),
            egress: None,
        }
    }

    fn egress_ended(room: &str, egress_id: &str, delivery: &str) -> MediaWebhook {
        MediaWebhook {
            kind: WebhookKind::EgressEnded,
            id: delivery.to_owned(),
            room_name: Some(room.to_owned()),
            egress: Some(EgressDescriptor {
                egress_id: ovmeet_types::recordings::EgressId::from(egress_id.to_owned()),
                room_name: room.to_owned(),
                status: EgressState::Complete,
                size: 2048,
                duration_secs: 30,
                error: None,
            }),
        }
    }

    #[tokio::test]
    async fn room_started_transitions_to_active_meeting() {
        let ctx = TestContext::new().await;
        let sink = ctx.webhook_sink();

        ctx.repos.rooms().put(&test_room("demo-1")).await.unwrap();

        sink.process(&room_started("demo-1", "EV_1")).await.unwrap();

        let room = ctx.repos.rooms().get(&room_id("demo-1")).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::ActiveMeeting);
    }

    #[tokio::test]
    async fn duplicate_deliveries_produce_side_effects_once() {
        let ctx = TestContext::new().await;
        let sink = ctx.webhook_sink();

        ctx.repos.rooms().put(&test_room("demo-1")).await.unwrap();

        let meeting_started_events = Arc::new(AtomicUsize::new(0));
        let counter = meeting_started_events.clone();
        let _ = ctx.bus.on(Topic::MeetingStarted, move |_| {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
        });

        // The same delivery id arrives twice (media server retry)
        sink.process(&room_started("demo-1", "EV_dup")).await.unwrap();
        sink.process(&room_started("demo-1", "EV_dup")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(meeting_started_events.load(Ordering::SeqCst), 1);

        let room = ctx.repos.rooms().get(&room_id("demo-1")).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::ActiveMeeting);
    }

    #[tokio::test]
    async fn concurrent_duplicate_deliveries_have_one_processor() {
        let ctx = TestContext::new().await;
        let sink = ctx.webhook_sink();

        ctx.repos.rooms().put(&test_room("demo-1")).await.unwrap();

        // Two replicas receive the same delivery concurrently; both must
        // acknowledge, one performs the transition.
        let other = ctx.webhook_sink();
        let (a, b) = tokio::join!(
            sink.process(&room_started("demo-1", "EV_race")),
            other.process(&room_started("demo-1", "EV_race")),
        );
        a.unwrap();
        b.unwrap();

        let room = ctx.repos.rooms().get(&room_id("demo-1")).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::ActiveMeeting);
    }

    #[tokio::test]
    async fn room_finished_consumes_the_deferred_delete() {
        let ctx = TestContext::new().await;
        let sink = ctx.webhook_sink();

        let mut room = test_room_with_meeting("demo-xxxx");
        room.meeting_end_action = MeetingEndAction::Delete;
        ctx.repos.rooms().put(&room).await.unwrap();

        sink.process(&room_finished("demo-xxxx", "EV_2")).await.unwrap();

        assert!(
            ctx.repos
                .rooms()
                .get(&room_id("demo-xxxx"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn unknown_rooms_are_logged_and_acknowledged() {
        let ctx = TestContext::new().await;
        let sink = ctx.webhook_sink();

        sink.process(&room_started("no-such-room", "EV_3"))
            .await
            .unwrap();
        sink.process(&room_finished("no-such-room", "EV_4"))
            .await
            .unwrap();
        sink.process(&egress_ended("no-such-room", "eg-1", "EV_5"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn egress_ended_runs_a_pending_deferred_action() {
        let ctx = TestContext::new().await;
        let sink = ctx.webhook_sink();

        // Meeting already ended, deferred delete pending, one recording
        // still finalising.
        let mut room = test_room("demo-1");
        room.meeting_end_action = MeetingEndAction::Delete;
        ctx.repos.rooms().put(&room).await.unwrap();

        let recording = ovmeet_types::recordings::Recording {
            recording_id: ovmeet_types::recordings::RecordingId::parse("demo-1--eg-7--u7")
                .unwrap(),
            room_id: room_id("demo-1"),
            status: ovmeet_types::recordings::RecordingStatus::Ending,
            size: 0,
            duration: 0.0,
            started_at: chrono::Utc::now(),
            ended_at: None,
            storage_path: "recordings/demo-1/demo-1--u7.mp4".into(),
            encoding: ovmeet_types::recordings::RecordingEncoding::default(),
        };
        ctx.repos.recordings().put(&recording).await.unwrap();

        sink.process(&egress_ended("demo-1", "eg-7", "EV_6")).await.unwrap();

        // The recording reached its terminal state and the deferred
        // deletion ran.
        assert!(
            ctx.repos
                .rooms()
                .get(&room_id("demo-1"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
