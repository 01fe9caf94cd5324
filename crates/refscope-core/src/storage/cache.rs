use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::Result;
use crate::models::{Identifier, MetadataRecord};
use crate::storage::kv::KeyValueStore;

/// Metadata cache keyed by identifier.
///
/// Writes to one identifier are serialized through a per-key async lock, so
/// a merge never loses a field written by another merge on the same key.
/// Different identifiers never wait on each other.
pub struct CacheStore {
    kv: Arc<dyn KeyValueStore>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, id: &Identifier) -> Result<Option<MetadataRecord>> {
        self.read(&id.cache_key())
    }

    /// Replace the whole entry.
    pub async fn set(&self, id: &Identifier, record: &MetadataRecord) -> Result<()> {
        let key = id.cache_key();
        let guard = self.lock(&key).await;
        let result = self.write(&key, record);
        self.release(&key, guard);
        result
    }

    /// Overwrite only the keys present in `patch`, creating the entry if
    /// needed. Returns the merged record.
    pub async fn merge(&self, id: &Identifier, patch: MetadataRecord) -> Result<MetadataRecord> {
        let key = id.cache_key();
        let guard = self.lock(&key).await;
        let result = self.read(&key).and_then(|current| {
            let mut merged = current.unwrap_or_default();
            merged.merge(patch);
            self.write(&key, &merged)?;
            Ok(merged)
        });
        self.release(&key, guard);
        result
    }

    /// Drop every cached record. Keys outside the identifier key space
    /// (user settings sharing the store) are kept. Returns how many records
    /// were removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for key in self.kv.keys()? {
            if Identifier::is_cache_key(&key) {
                let guard = self.lock(&key).await;
                let result = self.kv.remove(&key);
                self.release(&key, guard);
                result?;
                removed += 1;
            }
        }
        debug!(removed, "cache cleared");
        Ok(removed)
    }

    fn read(&self, key: &str) -> Result<Option<MetadataRecord>> {
        match self.kv.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, record: &MetadataRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.kv.set(key, &bytes)
    }

    async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.registry();
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Unlock and forget the key's lock once nobody else holds or awaits it.
    fn release(&self, key: &str, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.registry();
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
