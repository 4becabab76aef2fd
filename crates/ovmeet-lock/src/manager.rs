// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng as _;
use redis::{AsyncCommands as _, Script, Value, aio::ConnectionManager};
use serde::{Deserialize, Serialize};

use crate::{LockError, LockName, Result};

/// Redis key prefix all lock names live under.
const KEY_PREFIX: &str = "ovmeet:lock:";

const UNLOCK_SCRIPT: &str = r"
if redis.call('get',KEYS[1]) == ARGV[1] then
    return redis.call('del',KEYS[1])
else
    return 0
end";

const RENEW_SCRIPT: &str = r"
if redis.call('get',KEYS[1]) == ARGV[1] then
    return redis.call('pexpire',KEYS[1],ARGV[2])
else
    return 0
end";

/// Persisted value of a lock key.
///
/// The token is checked during release/renew to see if the lock is poised;
/// owner and acquisition timestamp feed the garbage collectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockValue {
    token: String,
    owner: String,
    acquired_at: DateTime<Utc>,
}

/// An acquired lock.
///
/// Dropping a `Lock` does not release it; the key expires via its TTL. Call
/// [`LockManager::release`] for an early release.
#[derive(Debug)]
pub struct Lock {
    name: String,
    value: String,
    acquired_at: DateTime<Utc>,
}

impl Lock {
    /// The rendered lock name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the lock was acquired.
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

/// Liveness metadata of a lock observed through [`LockManager::find_by_prefix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    pub name: String,
    pub owner: String,
    pub acquired_at: DateTime<Utc>,
}

/// Named, TTL'd distributed mutexes with liveness metadata.
///
/// Acquisition is single-winner and non-blocking; callers retry with their
/// own policy. All locks live in the process-wide shared store.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Try to acquire `name` for `ttl`. Returns `None` when another owner
    /// holds the lock.
    async fn acquire(&self, name: &LockName, ttl: Duration) -> Result<Option<Lock>>;

    /// Release an acquired lock.
    ///
    /// A no-op when the lock expired and was re-acquired by another owner.
    async fn release(&self, lock: Lock) -> Result<()>;

    /// Unconditionally remove a lock by name, regardless of its owner.
    ///
    /// Reserved for the garbage collectors; regular code paths use
    /// [`release`](Self::release).
    async fn force_release(&self, name: &str) -> Result<bool>;

    /// Whether a lock with `name` currently exists.
    async fn exists(&self, name: &LockName) -> Result<bool>;

    /// The acquisition timestamp of the lock, if it exists.
    async fn created_at(&self, name: &LockName) -> Result<Option<DateTime<Utc>>>;

    /// All live locks whose name starts with `prefix`.
    async fn find_by_prefix(&self, prefix: &str) -> Result<Vec<LockInfo>>;

    /// Extend the TTL of an acquired lock. Returns false when the lock is
    /// no longer held by this owner.
    async fn try_renew(&self, lock: &Lock, ttl: Duration) -> Result<bool>;
}

fn new_lock_value(owner: &str) -> (String, DateTime<Utc>) {
    let token: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(20)
        .map(char::from)
        .collect();

    let acquired_at = Utc::now();

    let value = LockValue {
        token,
        owner: owner.to_owned(),
        acquired_at,
    };

    let serialized =
        serde_json::to_string(&value).expect("lock value serialization cannot fail");

    (serialized, acquired_at)
}

fn parse_lock_value(raw: &str) -> Result<LockValue> {
    serde_json::from_str(raw).map_err(|e| LockError::CorruptMetadata {
        message: e.to_string(),
    })
}

/// [`LockManager`] backed by a single redis instance.
#[derive(Clone)]
pub struct RedisLockManager {
    redis: ConnectionManager,
    owner: String,
}

impl RedisLockManager {
    /// Create a manager identifying this replica as `owner`.
    pub fn new(redis: ConnectionManager, owner: impl Into<String>) -> Self {
        Self {
            redis,
            owner: owner.into(),
        }
    }

    fn key(name: &str) -> String {
        format!("{KEY_PREFIX}{name}")
    }
}

#[async_trait]
impl LockManager for RedisLockManager {
    async fn acquire(&self, name: &LockName, ttl: Duration) -> Result<Option<Lock>> {
        let name = name.to_string();
        let (value, acquired_at) = new_lock_value(&self.owner);

        let mut redis = self.redis.clone();

        // SET the lock key with the following args:
        // Value: metadata whose token is checked during unlock
        // NX: Only set the key if it does not exist on the server
        // PX + Time: Set expire time
        let res: Value = redis::cmd("SET")
            .arg(Self::key(&name))
            .arg(&value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut redis)
            .await?;

        if let Value::Okay = res {
            Ok(Some(Lock {
                name,
                value,
                acquired_at,
            }))
        } else {
            Ok(None)
        }
    }

    async fn release(&self, lock: Lock) -> Result<()> {
        let mut redis = self.redis.clone();

        let _removed: i32 = Script::new(UNLOCK_SCRIPT)
            .key(Self::key(&lock.name))
            .arg(&lock.value)
            .invoke_async(&mut redis)
            .await?;

        Ok(())
    }

    async fn force_release(&self, name: &str) -> Result<bool> {
        let mut redis = self.redis.clone();

        let removed: i32 = redis.del(Self::key(name)).await?;

        Ok(removed > 0)
    }

    async fn exists(&self, name: &LockName) -> Result<bool> {
        let mut redis = self.redis.clone();

        Ok(redis.exists(Self::key(&name.to_string())).await?)
    }

    async fn created_at(&self, name: &LockName) -> Result<Option<DateTime<Utc>>> {
        let mut redis = self.redis.clone();

        let raw: Option<String> = redis.get(Self::key(&name.to_string())).await?;

        match raw {
            Some(raw) => Ok(Some(parse_lock_value(&raw)?.acquired_at)),
            None => Ok(None),
        }
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Vec<LockInfo>> {
        let mut redis = self.redis.clone();
        let pattern = format!("{KEY_PREFIX}{prefix}*");

        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut redis)
                .await?;

            keys.extend(batch);

            if next == 0 {
                break;
            }
            cursor = next;
        }

        let mut locks = Vec::with_capacity(keys.len());

        for key in keys {
            // The key may expire between SCAN and GET
            let raw: Option<String> = redis.get(&key).await?;
            let Some(raw) = raw else {
                continue;
            };

            let value = parse_lock_value(&raw)?;

            locks.push(LockInfo {
                name: key.trim_start_matches(KEY_PREFIX).to_owned(),
                owner: value.owner,
                acquired_at: value.acquired_at,
            });
        }

        Ok(locks)
    }

    async fn try_renew(&self, lock: &Lock, ttl: Duration) -> Result<bool> {
        let mut redis = self.redis.clone();

        let renewed: i32 = Script::new(RENEW_SCRIPT)
            .key(Self::key(&lock.name))
            .arg(&lock.value)
            .arg(ttl.as_millis() as u64)
            .invoke_async(&mut redis)
            .await?;

        Ok(renewed == 1)
    }
}

#[derive(Debug)]
struct MemoryEntry {
    value: String,
    parsed: LockValue,
    expires_at: Instant,
}

/// In-memory [`LockManager`] for tests and single-replica development.
#[derive(Default)]
pub struct MemoryLockManager {
    owner: String,
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryLockManager {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            entries: Mutex::default(),
        }
    }

    fn purge_expired(entries: &mut HashMap<String, MemoryEntry>) {
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn acquire(&self, name: &LockName, ttl: Duration) -> Result<Option<Lock>> {
        let name = name.to_string();
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries);

        if entries.contains_key(&name) {
            return Ok(None);
        }

        let (value, acquired_at) = new_lock_value(&self.owner);
        let parsed = parse_lock_value(&value)?;

        let _ = entries.insert(
            name.clone(),
            MemoryEntry {
                value: value.clone(),
                parsed,
                expires_at: Instant::now() + ttl,
            },
        );

        Ok(Some(Lock {
            name,
            value,
            acquired_at,
        }))
    }

    async fn release(&self, lock: Lock) -> Result<()> {
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries);

        if entries
            .get(&lock.name)
            .is_some_and(|entry| entry.value == lock.value)
        {
            let _ = entries.remove(&lock.name);
        }

        Ok(())
    }

    async fn force_release(&self, name: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries);

        Ok(entries.remove(name).is_some())
    }

    async fn exists(&self, name: &LockName) -> Result<bool> {
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries);

        Ok(entries.contains_key(&name.to_string()))
    }

    async fn created_at(&self, name: &LockName) -> Result<Option<DateTime<Utc>>> {
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries);

        Ok(entries
            .get(&name.to_string())
            .map(|entry| entry.parsed.acquired_at))
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Vec<LockInfo>> {
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries);

        Ok(entries
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, entry)| LockInfo {
                name: name.clone(),
                owner: entry.parsed.owner.clone(),
                acquired_at: entry.parsed.acquired_at,
            })
            .collect())
    }

    async fn try_renew(&self, lock: &Lock, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries);

        match entries.get_mut(&lock.name) {
            Some(entry) if entry.value == lock.value => {
                entry.expires_at = Instant::now() + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use ovmeet_types::rooms::RoomId;

    fn room(id: &str) -> RoomId {
        RoomId::parse(id).unwrap()
    }

    const TTL: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn acquisition_is_single_winner() {
        let manager = MemoryLockManager::new("replica-1");
        let name = LockName::RecordingActive(room("demo-1234"));

        let lock = manager.acquire(&name, TTL).await.unwrap().unwrap();
        assert!(manager.acquire(&name, TTL).await.unwrap().is_none());

        manager.release(lock).await.unwrap();
        assert!(manager.acquire(&name, TTL).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn release_of_foreign_lock_is_a_noop() {
        let manager = MemoryLockManager::new("replica-1");
        let name = LockName::RecordingActive(room("demo-1234"));

        let stale = manager.acquire(&name, TTL).await.unwrap().unwrap();
        assert!(manager.force_release(&name.to_string()).await.unwrap());

        // Another owner takes the lock; the stale guard must not revoke it.
        let current = manager.acquire(&name, TTL).await.unwrap().unwrap();
        manager.release(stale).await.unwrap();

        assert!(manager.exists(&name).await.unwrap());
        manager.release(current).await.unwrap();
        assert!(!manager.exists(&name).await.unwrap());
    }

    #[tokio::test]
    async fn expired_locks_are_not_visible() {
        let manager = MemoryLockManager::new("replica-1");
        let name = LockName::StorageInit;

        let _lock = manager
            .acquire(&name, Duration::from_millis(1))
            .await
            .unwrap()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!manager.exists(&name).await.unwrap());
        assert_eq!(manager.created_at(&name).await.unwrap(), None);
    }

    #[tokio::test]
    async fn renew_requires_ownership() {
        let manager = MemoryLockManager::new("replica-1");
        let name = LockName::Migration;

        let lock = manager.acquire(&name, TTL).await.unwrap().unwrap();
        assert!(manager.try_renew(&lock, TTL).await.unwrap());

        assert!(manager.force_release(&name.to_string()).await.unwrap());
        let _other = manager.acquire(&name, TTL).await.unwrap().unwrap();

        assert!(!manager.try_renew(&lock, TTL).await.unwrap());
    }

    #[tokio::test]
    async fn find_by_prefix_returns_liveness_metadata() {
        let manager = MemoryLockManager::new("replica-7");

        let _a = manager
            .acquire(&LockName::RecordingActive(room("demo-1")), TTL)
            .await
            .unwrap()
            .unwrap();
        let _b = manager
            .acquire(&LockName::RecordingActive(room("demo-2")), TTL)
            .await
            .unwrap()
            .unwrap();
        let _c = manager
            .acquire(&LockName::StorageInit, TTL)
            .await
            .unwrap()
            .unwrap();

        let mut found = manager
            .find_by_prefix(LockName::RECORDING_ACTIVE_PREFIX)
            .await
            .unwrap();
        found.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "recording_active_demo-1");
        assert_eq!(found[0].owner, "replica-7");
        assert_eq!(found[1].name, "recording_active_demo-2");
    }

    #[tokio::test]
    #[ignore = "requires a running redis, set REDIS_ADDR to override localhost"]
    async fn redis_lock_unlock_and_relock() {
        let redis_url =
            std::env::var("REDIS_ADDR").unwrap_or_else(|_| "redis://localhost:6379/".to_owned());
        let client = redis::Client::open(redis_url).expect("Invalid redis url");
        let conn = ConnectionManager::new(client)
            .await
            .expect("Failed to get redis connection");

        let manager = RedisLockManager::new(conn, "test-replica");
        let name = LockName::Registry("lock-test".into());

        let guard = manager.acquire(&name, TTL).await.unwrap().unwrap();
        assert!(manager.acquire(&name, TTL).await.unwrap().is_none());
        assert!(manager.created_at(&name).await.unwrap().is_some());

        manager.release(guard).await.unwrap();
        let guard2 = manager.acquire(&name, TTL).await.unwrap().unwrap();
        manager.release(guard2).await.unwrap();
    }
}
