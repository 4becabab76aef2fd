// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Cursor based pagination query parameters.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Maximum number of items a single page may contain.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

fn default_max_items() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Pagination query parameters shared by every list endpoint.
///
/// Cursors are opaque tokens returned by the storage layer; clients must
/// treat them as black boxes.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    /// Maximum number of items to return.
    #[serde(default = "default_max_items")]
    #[validate(range(min = 1, max = 100))]
    pub max_items: u32,
    /// Cursor of the page to fetch, from a previous response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_PAGE_SIZE,
            next_page_token: None,
        }
    }
}
