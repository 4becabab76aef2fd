// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! One-time storage seeding at startup.
//!
//! Exactly one replica wins the `storage_init` lock, seeds the defaults
//! and broadcasts `StorageReady`; the other replicas wait on that event.

use std::{sync::Arc, time::Duration};

use ovmeet_exchange::{EventBus, SystemEvent, Topic};
use ovmeet_lock::{LockManager, LockName};
use ovmeet_types::{auth::ApiKey, config::GlobalConfig, users::User};

use crate::{Repositories, Result};

const INIT_LOCK_TTL: Duration = Duration::from_secs(60);
const READY_WAIT_WINDOW: Duration = Duration::from_secs(10);

/// Defaults written by the winning replica.
///
/// The caller prepares the documents (password hashing, key generation)
/// so the storage layer stays free of crypto concerns.
#[derive(Debug, Clone)]
pub struct StorageSeed {
    pub global_config: GlobalConfig,
    pub initial_admin: User,
    pub api_key: ApiKey,
}

pub struct StorageInitializer {
    repos: Repositories,
    locks: Arc<dyn LockManager>,
    bus: EventBus,
}

impl StorageInitializer {
    pub fn new(repos: Repositories, locks: Arc<dyn LockManager>, bus: EventBus) -> Self {
        Self { repos, locks, bus }
    }

    /// Run the initialization protocol until storage is ready.
    pub async fn run(&self, seed: StorageSeed) -> Result<()> {
        loop {
            // Subscribe before racing for the lock so a winner's broadcast
            // between the two steps is not lost.
            let mut ready = self.bus.subscribe(&[Topic::StorageReady]);

            match self.locks.acquire(&LockName::StorageInit, INIT_LOCK_TTL).await {
                Ok(Some(lock)) => {
                    let seeded = self.seed(&seed).await;

                    if let Err(e) = self.locks.release(lock).await {
                        log::warn!("Failed to release storage_init lock: {e}");
                    }

                    seeded?;

                    self.bus.broadcast(&SystemEvent::StorageReady);
                    log::info!("Storage initialized, defaults seeded");
                    return Ok(());
                }
                Ok(None) => {
                    log::debug!("Another replica runs the storage initialization, waiting");
                }
                Err(e) => {
                    log::warn!("Could not reach the lock store for storage init: {e}");
                }
            }

            let ready_event = EventBus::wait_on_subscription(
                &mut ready,
                Topic::StorageReady,
                |_| true,
                READY_WAIT_WINDOW,
            )
            .await;

            if ready_event.is_ok() {
                return Ok(());
            }

            // The winner may have finished before we subscribed, or died
            // holding the lock. Check the seeded state directly and retry
            // the race otherwise.
            if self.repos.config().get_global().await?.is_some() {
                return Ok(());
            }
        }
    }

    async fn seed(&self, seed: &StorageSeed) -> Result<()> {
        let config = self.repos.config();

        if config.get_global().await?.is_none() {
            config.put_global(&seed.global_config).await?;
        }

        let users = self.repos.users();
        if users.get(&seed.initial_admin.user_id).await?.is_none() {
            users.put(&seed.initial_admin).await?;
            log::info!(
                "Seeded initial admin account {}",
                seed.initial_admin.user_id
            );
        }

        if config.get_api_key().await?.is_none() {
            config.put_api_key(&seed.api_key).await?;
            log::info!("Seeded default API key");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ovmeet_exchange::ExchangeTask;
    use ovmeet_lock::MemoryLockManager;
    use ovmeet_types::users::{UserId, UserRole};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Cache, MemoryObjectStore};

    fn seed() -> StorageSeed {
        StorageSeed {
            global_config: GlobalConfig::default(),
            initial_admin: User {
                user_id: UserId::from("admin"),
                name: "Admin".into(),
                password_hash: "$argon2id$fake".into(),
                role: UserRole::Admin,
                must_change_password: true,
            },
            api_key: ApiKey {
                key: "ovmeet-ak-test".into(),
                creation_date: Utc::now(),
            },
        }
    }

    async fn initializer() -> StorageInitializer {
        let repos = Repositories::new(
            Arc::new(MemoryObjectStore::new()),
            Cache::memory("test", Duration::from_secs(60)),
        );
        let bus = EventBus::new(ExchangeTask::spawn());

        StorageInitializer::new(repos, Arc::new(MemoryLockManager::new("replica-1")), bus)
    }

    #[tokio::test]
    async fn seeds_defaults_exactly_once() {
        let init = initializer().await;

        init.run(seed()).await.unwrap();

        let config = init.repos.config();
        assert_eq!(
            config.get_global().await.unwrap(),
            Some(GlobalConfig::default())
        );
        let api_key = config.get_api_key().await.unwrap().unwrap();
        assert_eq!(api_key.key, "ovmeet-ak-test");

        // A second run must not overwrite the existing key.
        let mut second = seed();
        second.api_key.key = "ovmeet-ak-other".into();
        init.run(second).await.unwrap();

        let api_key = config.get_api_key().await.unwrap().unwrap();
        assert_eq!(api_key.key, "ovmeet-ak-test");
    }
}
