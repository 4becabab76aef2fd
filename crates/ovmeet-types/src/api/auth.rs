// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Authentication API request and response bodies.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::ApiKey;

/// Body of `POST /internal-api/v1/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostLoginRequestBody {
    /// User id to log in as.
    #[validate(length(min = 1, max = 100))]
    pub user_id: String,
    /// Password.
    #[validate(length(min = 1, max = 200))]
    pub password: String,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponseBody {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token, rotated on use.
    pub refresh_token: String,
}

/// Body of `POST /internal-api/v1/auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostRefreshRequestBody {
    /// The refresh token to rotate.
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Body of `POST /internal-api/v1/auth/change-password`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostChangePasswordRequestBody {
    /// The current password.
    #[validate(length(min = 1, max = 200))]
    pub current_password: String,
    /// The new password.
    #[validate(length(min = 8, max = 200))]
    pub new_password: String,
}

/// Body of `POST /internal-api/v1/api-keys` and `GET` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponseBody {
    /// The active API key.
    #[serde(flatten)]
    pub api_key: ApiKey,
}
