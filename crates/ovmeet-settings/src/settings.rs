// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use snafu::{ResultExt, Snafu};

use crate::{
    backends::{LiveKit, MinIO, RabbitMq, Redis},
    domain::{Http, InitialAccount, Recordings, Rooms, Tokens},
};

#[derive(Debug, Snafu)]
pub enum SettingsError {
    #[snafu(display("Failed to read settings from {path}: {source}"))]
    Read {
        path: String,
        source: config::ConfigError,
    },

    #[snafu(display("Invalid settings: {source}"))]
    Deserialize { source: config::ConfigError },
}

/// Root settings of the controller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub http: Http,

    #[serde(default)]
    pub redis: Redis,

    pub minio: MinIO,

    /// Absent in single-replica deployments.
    #[serde(default)]
    pub rabbit_mq: Option<RabbitMq>,

    pub livekit: LiveKit,

    pub tokens: Tokens,

    #[serde(default)]
    pub rooms: Rooms,

    #[serde(default)]
    pub recordings: Recordings,

    pub initial_account: InitialAccount,
}

impl Settings {
    /// Load settings from the TOML file at `path` with `OVMEET_` environment
    /// overrides applied on top.
    pub fn load(path: &str) -> Result<Self, SettingsError> {
        Config::builder()
            .add_source(File::new(path, FileFormat::Toml))
            .add_source(Environment::with_prefix("OVMEET").separator("__"))
            .build()
            .context(ReadSnafu { path })?
            .try_deserialize()
            .context(DeserializeSnafu)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const MINIMAL: &str = r#"
        [http]
        public_url = "https://meet.example.com"

        [minio]
        uri = "http://localhost:9000"
        bucket = "ovmeet"
        access_key = "minioadmin"
        secret_key = "minioadmin"

        [livekit]
        api_key = "devkey"
        api_secret = "devsecret"
        public_url = "wss://livekit.example.com"
        service_url = "http://localhost:7880"

        [tokens]
        secret = "super-secret"

        [initial_account]
        password = "change-me"
    "#;

    #[test]
    fn minimal_settings_use_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(MINIMAL, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.http.port, 9080);
        assert_eq!(settings.redis.url.as_str(), "redis://localhost:6379/");
        assert_eq!(settings.rabbit_mq, None);
        assert_eq!(settings.rooms.id_suffix_length, 4);
        assert_eq!(settings.recordings.start_timeout_secs, 30);
        assert_eq!(settings.initial_account.user_id, "admin");
    }
}
