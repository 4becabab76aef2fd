// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use std::sync::Arc;

use ovmeet_types::users::{User, UserId};

use super::{delete_document, get_document, put_document};
use crate::{Cache, ObjectKey, ObjectStore, Result};

/// Repository for user accounts.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn ObjectStore>,
    cache: Cache,
}

impl UserRepository {
    pub(crate) fn new(store: Arc<dyn ObjectStore>, cache: Cache) -> Self {
        Self { store, cache }
    }

    pub async fn get(&self, user_id: &UserId) -> Result<Option<User>> {
        get_document(&self.store, &self.cache, &ObjectKey::user(user_id)).await
    }

    pub async fn put(&self, user: &User) -> Result<()> {
        put_document(
            &self.store,
            &self.cache,
            &ObjectKey::user(&user.user_id),
            user,
        )
        .await
    }

    pub async fn delete(&self, user_id: &UserId) -> Result<()> {
        delete_document(&self.store, &self.cache, &ObjectKey::user(user_id)).await
    }
}
