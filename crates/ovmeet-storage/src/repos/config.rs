// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use std::sync::Arc;

use ovmeet_types::{auth::ApiKey, config::GlobalConfig};

use super::{delete_document, get_document, put_document};
use crate::{Cache, ObjectKey, ObjectStore, Result};

/// Repository for the global configuration and the management API key.
#[derive(Clone)]
pub struct ConfigRepository {
    store: Arc<dyn ObjectStore>,
    cache: Cache,
}

impl ConfigRepository {
    pub(crate) fn new(store: Arc<dyn ObjectStore>, cache: Cache) -> Self {
        Self { store, cache }
    }

    pub async fn get_global(&self) -> Result<Option<GlobalConfig>> {
        get_document(&self.store, &self.cache, &ObjectKey::global_config()).await
    }

    pub async fn put_global(&self, config: &GlobalConfig) -> Result<()> {
        put_document(&self.store, &self.cache, &ObjectKey::global_config(), config).await
    }

    /// The active API key. At most one exists; creating a new one replaces
    /// it.
    pub async fn get_api_key(&self) -> Result<Option<ApiKey>> {
        get_document(&self.store, &self.cache, &ObjectKey::api_key()).await
    }

    pub async fn put_api_key(&self, api_key: &ApiKey) -> Result<()> {
        put_document(&self.store, &self.cache, &ObjectKey::api_key(), api_key).await
    }

    pub async fn delete_api_key(&self) -> Result<()> {
        delete_document(&self.store, &self.cache, &ObjectKey::api_key()).await
    }
}
