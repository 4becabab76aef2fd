// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use bytes::Bytes;
use futures::stream;
use parking_lot::RwLock;

use super::{ListPage, ObjectStorageError, ObjectStore, RangedRead};

type Result<T, E = ObjectStorageError> = std::result::Result<T, E>;

/// In-memory [`ObjectStore`] used by tests and single-process development.
///
/// Listing semantics mirror S3: lexicographic order, delimiter roll-up and
/// opaque continuation tokens.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects, for test assertions.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    fn encode_cursor(last_key: &str) -> String {
        URL_SAFE_NO_PAD.encode(last_key)
    }

    fn decode_cursor(token: &str) -> Result<String> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| ObjectStorageError::List { source: e.into() })?;

        String::from_utf8(raw).map_err(|e| ObjectStorageError::List { source: e.into() })
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let _ = self.objects.write().insert(key.to_owned(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.objects.read().get(key).cloned())
    }

    async fn get_range(&self, key: &str, start: u64, end: u64) -> Result<RangedRead> {
        let data = self
            .objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ObjectStorageError::NotFound {
                key: key.to_owned(),
            })?;

        let file_size = data.len() as u64;

        if start >= file_size {
            return Err(ObjectStorageError::RangeNotSatisfiable {
                key: key.to_owned(),
                start,
                end,
            });
        }

        let end = end.min(file_size.saturating_sub(1));
        let chunk = data.slice(start as usize..=end as usize);

        Ok(RangedRead {
            file_size,
            start,
            end,
            body: Box::pin(stream::iter([Ok(chunk)])),
        })
    }

    async fn size_if_exists(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.objects.read().get(key).map(|data| data.len() as u64))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _ = self.objects.write().remove(key);
        Ok(())
    }

    async fn list(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        max_keys: u32,
        continuation: Option<&str>,
    ) -> Result<ListPage> {
        let after = continuation.map(Self::decode_cursor).transpose()?;

        let objects = self.objects.read();

        let mut keys = Vec::new();
        let mut next_token = None;

        for key in objects
            .range(prefix.to_owned()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .filter(|key| match &after {
                Some(after) => key.as_str() > after.as_str(),
                None => true,
            })
        {
            // Delimiter roll-up: skip keys nested deeper than the prefix.
            if let Some(delimiter) = delimiter {
                if key[prefix.len()..].contains(delimiter) {
                    continue;
                }
            }

            if keys.len() as u32 == max_keys {
                next_token = keys.last().map(|last: &String| Self::encode_cursor(last));
                break;
            }

            keys.push(key.clone());
        }

        Ok(ListPage { keys, next_token })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    async fn store_with(keys: &[&str]) -> MemoryObjectStore {
        let store = MemoryObjectStore::new();
        for key in keys {
            store.put(key, Bytes::from_static(b"{}")).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn delimiter_rolls_up_nested_keys() {
        let store = store_with(&[
            "rooms/demo-1",
            "rooms/demo-1/members/alice",
            "rooms/demo-2",
        ])
        .await;

        let page = store.list("rooms/", Some("/"), 100, None).await.unwrap();

        assert_eq!(page.keys, vec!["rooms/demo-1", "rooms/demo-2"]);
        assert_eq!(page.next_token, None);
    }

    #[tokio::test]
    async fn pagination_round_trip_yields_every_key_once() {
        let keys: Vec<String> = (0..25).map(|i| format!("rooms/room-{i:02}")).collect();
        let store = MemoryObjectStore::new();
        for key in &keys {
            store.put(key, Bytes::from_static(b"{}")).await.unwrap();
        }

        let mut collected = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = store
                .list("rooms/", Some("/"), 10, token.as_deref())
                .await
                .unwrap();
            collected.extend(page.keys);

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        assert_eq!(collected, keys);
    }

    #[tokio::test]
    async fn ranged_reads_clamp_to_the_file_size() {
        let store = MemoryObjectStore::new();
        store
            .put("recordings/demo/file.mp4", Bytes::from_static(b"0123456789"))
            .await
            .unwrap();

        let read = store
            .get_range("recordings/demo/file.mp4", 4, 1000)
            .await
            .unwrap();

        assert_eq!(read.file_size, 10);
        assert_eq!(read.start, 4);
        assert_eq!(read.end, 9);

        let err = store
            .get_range("recordings/demo/file.mp4", 10, 12)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ObjectStorageError::RangeNotSatisfiable { .. }
        ));
    }
}
