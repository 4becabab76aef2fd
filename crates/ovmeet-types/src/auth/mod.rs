// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! API keys and authentication related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of every generated API key.
pub const API_KEY_PREFIX: &str = "ovmeet-ak-";

/// An opaque management API key.
///
/// At most one API key is active at any time; creating a new one replaces
/// the previous key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    /// The opaque key value, prefixed with [`API_KEY_PREFIX`].
    pub key: String,
    /// Creation timestamp.
    pub creation_date: DateTime<Utc>,
}

impl ApiKey {
    /// Whether `candidate` matches this key.
    pub fn matches(&self, candidate: &str) -> bool {
        self.key == candidate
    }
}
