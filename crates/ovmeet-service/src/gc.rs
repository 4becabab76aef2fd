// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Registration of the background garbage collectors.

use std::time::Duration;

use ovmeet_scheduler::{SchedulerError, TaskScheduler, task_fn};

use crate::{RecordingService, RoomService, ServiceConfig};

/// Lock TTL of the minutely cron firings; must stay below the period.
const CRON_LOCK_TTL: Duration = Duration::from_secs(50);

/// Register the room and recording garbage collectors.
///
/// The minutely room GCs run cluster-wide (one replica per firing); the
/// orphaned-lock GC runs on every replica, its releases are idempotent.
pub async fn register_garbage_collectors(
    scheduler: &TaskScheduler,
    rooms: RoomService,
    recordings: RecordingService,
    config: &ServiceConfig,
) -> Result<(), SchedulerError> {
    let expiration = rooms.clone();
    scheduler
        .register_cron(
            "room_expiration",
            "0 * * * * *",
            CRON_LOCK_TTL,
            task_fn(move || {
                let rooms = expiration.clone();
                async move { rooms.expiration_gc().await }
            }),
        )
        .await?;

    let consistency = rooms;
    scheduler
        .register_cron(
            "room_status_consistency",
            "30 * * * * *",
            CRON_LOCK_TTL,
            task_fn(move || {
                let rooms = consistency.clone();
                async move { rooms.status_consistency_gc().await }
            }),
        )
        .await?;

    scheduler
        .register_interval(
            "recording_orphan_locks",
            config.orphan_gc_interval,
            task_fn(move || {
                let recordings = recordings.clone();
                async move { recordings.orphan_lock_gc().await }
            }),
        )
        .await;

    Ok(())
}
