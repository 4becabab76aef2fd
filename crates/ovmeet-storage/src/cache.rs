// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Shared write-through cache in front of the object store.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use redis::{AsyncCommands as _, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};
use snafu::Snafu;

use crate::StorageError;

#[derive(Debug, Snafu)]
pub enum CacheError {
    #[snafu(display("Redis error: {source}"), context(false))]
    Redis { source: redis::RedisError },

    #[snafu(display("Cache serialization error: {source}"), context(false))]
    Serde { source: serde_json::Error },
}

impl From<CacheError> for StorageError {
    fn from(value: CacheError) -> Self {
        Self::Cache {
            message: value.to_string(),
        }
    }
}

enum Backend {
    Redis(ConnectionManager),
    Memory(Arc<Mutex<HashMap<String, (String, Instant)>>>),
}

/// Application level cache storing JSON documents under a common prefix.
///
/// Backed by redis so all replicas share one cache; the memory backend
/// serves tests and single-process development.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<Backend>,
    prefix: String,
    ttl: Duration,
}

impl Cache {
    pub fn redis(redis: ConnectionManager, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            backend: Arc::new(Backend::Redis(redis)),
            prefix: prefix.into(),
            ttl,
        }
    }

    pub fn memory(prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            backend: Arc::new(Backend::Memory(Arc::default())),
            prefix: prefix.into(),
            ttl,
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    pub async fn get<V>(&self, key: &str) -> Result<Option<V>, CacheError>
    where
        V: DeserializeOwned,
    {
        let raw = match &*self.backend {
            Backend::Redis(redis) => {
                let mut redis = redis.clone();
                redis.get::<_, Option<String>>(self.full_key(key)).await?
            }
            Backend::Memory(entries) => {
                let mut entries = entries.lock();
                match entries.get(&self.full_key(key)) {
                    Some((value, inserted)) if inserted.elapsed() < self.ttl => {
                        Some(value.clone())
                    }
                    Some(_) => {
                        let _ = entries.remove(&self.full_key(key));
                        None
                    }
                    None => None,
                }
            }
        };

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn insert<V>(&self, key: &str, value: &V) -> Result<(), CacheError>
    where
        V: Serialize,
    {
        let raw = serde_json::to_string(value)?;

        match &*self.backend {
            Backend::Redis(redis) => {
                let mut redis = redis.clone();
                let () = redis
                    .set_ex(self.full_key(key), raw, self.ttl.as_secs())
                    .await?;
            }
            Backend::Memory(entries) => {
                let _ = entries
                    .lock()
                    .insert(self.full_key(key), (raw, Instant::now()));
            }
        }

        Ok(())
    }

    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        match &*self.backend {
            Backend::Redis(redis) => {
                let mut redis = redis.clone();
                let _: i32 = redis.del(self.full_key(key)).await?;
            }
            Backend::Memory(entries) => {
                let _ = entries.lock().remove(&self.full_key(key));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn memory_cache_round_trip() {
        let cache = Cache::memory("ovmeet:cache", Duration::from_secs(60));

        cache.insert("rooms/demo-1", &42u32).await.unwrap();

        assert_eq!(cache.get::<u32>("rooms/demo-1").await.unwrap(), Some(42));

        cache.invalidate("rooms/demo-1").await.unwrap();
        assert_eq!(cache.get::<u32>("rooms/demo-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = Cache::memory("ovmeet:cache", Duration::from_millis(1));

        cache.insert("rooms/demo-1", &1u32).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(cache.get::<u32>("rooms/demo-1").await.unwrap(), None);
    }
}
