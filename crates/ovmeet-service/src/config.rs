// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use std::time::Duration;

use ovmeet_settings::Settings;
use url::Url;

/// Runtime knobs the services derive from the loaded [`Settings`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Public base URL used to build shareable links.
    pub public_url: Url,
    /// Length of the random room id suffix.
    pub room_id_suffix_length: usize,
    /// Minimum lead time of `auto_deletion_date`.
    pub min_auto_deletion_lead: chrono::Duration,
    /// TTL of the `recording_active` lock.
    pub recording_lock_ttl: Duration,
    /// Window to wait for a started recording to become active.
    pub recording_start_timeout: Duration,
    /// Interval of the orphaned-lock garbage collector.
    pub orphan_gc_interval: Duration,
    /// Minimum age before the orphaned-lock GC touches a lock.
    pub orphan_lock_grace: chrono::Duration,
}

impl From<&Settings> for ServiceConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            public_url: settings.http.public_url.clone(),
            room_id_suffix_length: settings.rooms.id_suffix_length,
            min_auto_deletion_lead: chrono::Duration::minutes(
                settings.rooms.min_auto_deletion_lead_minutes,
            ),
            recording_lock_ttl: Duration::from_secs(settings.recordings.lock_ttl_secs),
            recording_start_timeout: Duration::from_secs(settings.recordings.start_timeout_secs),
            orphan_gc_interval: Duration::from_secs(settings.recordings.orphan_gc_interval_secs),
            orphan_lock_grace: chrono::Duration::minutes(1),
        }
    }
}

impl ServiceConfig {
    /// Config with short windows for tests.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            public_url: "https://meet.example.com".parse().expect("static url"),
            room_id_suffix_length: 4,
            min_auto_deletion_lead: chrono::Duration::minutes(60),
            recording_lock_ttl: Duration::from_secs(60),
            recording_start_timeout: Duration::from_millis(400),
            orphan_gc_interval: Duration::from_secs(60),
            orphan_lock_grace: chrono::Duration::zero(),
        }
    }
}
