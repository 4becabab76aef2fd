// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use serde::Deserialize;
use url::Url;

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Http {
    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Path prefix of the public API surface.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Public base URL used to build shareable links.
    pub public_url: Url,
}

fn default_http_port() -> u16 {
    9080
}

fn default_base_path() -> String {
    String::new()
}

/// Token signing and lifetime settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tokens {
    /// HS256 signing secret.
    pub secret: String,

    /// Access token lifetime in seconds.
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_secs: u64,

    /// Refresh token lifetime in seconds.
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_secs: u64,

    /// Room member token lifetime in seconds.
    #[serde(default = "default_member_token_ttl")]
    pub member_token_ttl_secs: u64,
}

fn default_access_token_ttl() -> u64 {
    15 * 60
}

fn default_refresh_token_ttl() -> u64 {
    30 * 24 * 60 * 60
}

fn default_member_token_ttl() -> u64 {
    12 * 60 * 60
}

/// Room lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rooms {
    /// Length of the random room id suffix.
    #[serde(default = "default_id_suffix_length")]
    pub id_suffix_length: usize,

    /// Minimum lead time of `auto_deletion_date` in minutes.
    #[serde(default = "default_auto_deletion_lead")]
    pub min_auto_deletion_lead_minutes: i64,
}

impl Default for Rooms {
    fn default() -> Self {
        Self {
            id_suffix_length: default_id_suffix_length(),
            min_auto_deletion_lead_minutes: default_auto_deletion_lead(),
        }
    }
}

fn default_id_suffix_length() -> usize {
    4
}

fn default_auto_deletion_lead() -> i64 {
    60
}

/// Recording lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Recordings {
    /// TTL of the `recording_active` lock in seconds.
    #[serde(default = "default_recording_lock_ttl")]
    pub lock_ttl_secs: u64,

    /// Maximum time to wait for the recording to become active.
    #[serde(default = "default_start_timeout")]
    pub start_timeout_secs: u64,

    /// Interval of the orphaned-lock garbage collector.
    #[serde(default = "default_orphan_gc_interval")]
    pub orphan_gc_interval_secs: u64,
}

impl Default for Recordings {
    fn default() -> Self {
        Self {
            lock_ttl_secs: default_recording_lock_ttl(),
            start_timeout_secs: default_start_timeout(),
            orphan_gc_interval_secs: default_orphan_gc_interval(),
        }
    }
}

fn default_recording_lock_ttl() -> u64 {
    5 * 60
}

fn default_start_timeout() -> u64 {
    30
}

fn default_orphan_gc_interval() -> u64 {
    2 * 60
}

/// Credentials of the initial admin account seeded at first startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitialAccount {
    #[serde(default = "default_admin_user")]
    pub user_id: String,

    pub password: String,
}

fn default_admin_user() -> String {
    "admin".to_owned()
}
