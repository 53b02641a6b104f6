use super::{KvStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

/// A process-local [`KvStore`].
///
/// Every operation runs under one lock, which gives the same per-operation
/// atomicity redis offers. Expiration follows the tokio clock, so a paused
/// test runtime can step over a TTL without sleeping. Clones share the same
/// map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys that have not expired yet.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    #[cfg(test)]
    async fn held(&self) -> usize {
        self.entries.lock().await.len()
    }
}

fn purge_expired(entries: &mut HashMap<String, Entry>, now: Instant) {
    entries.retain(|_, entry| entry.is_live(now));
}

#[async_trait::async_trait]
impl KvStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_expiration(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_vec(),
            expires_at: Some(now + ttl),
        };

        let mut entries = self.entries.lock().await;
        // writes are what grow the map, so they also sweep it
        purge_expired(&mut entries, now);
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, now);

        let current = match entries.get(key) {
            Some(entry) => std::str::from_utf8(&entry.value)
                .ok()
                .and_then(|raw| raw.parse::<i64>().ok())
                .ok_or_else(|| StoreError::NotAnInteger(key.to_string()))?,
            None => 0,
        };

        let next = current
            .checked_add(1)
            .ok_or_else(|| StoreError::Overflow(key.to_string()))?;

        // Like INCR, keep whatever expiration the key already had.
        let expires_at = entries.get(key).and_then(|entry| entry.expires_at);
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string().into_bytes(),
                expires_at,
            },
        );

        Ok(next)
    }
}
