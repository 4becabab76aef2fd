// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Settings for the OvMeet controller.
//!
//! Settings are loaded from a TOML file and can be overridden through
//! environment variables prefixed with `OVMEET_` (nested fields separated
//! by `__`, e.g. `OVMEET_REDIS__URL`).

mod backends;
mod domain;
mod settings;

pub use backends::{LiveKit, MinIO, RabbitMq, Redis};
pub use domain::{Http, InitialAccount, Recordings, Rooms, Tokens};
pub use settings::{Settings, SettingsError};
