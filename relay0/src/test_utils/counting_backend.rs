//! CountingBackend — an in-memory backend that records every operation.

use crate::error::StorageError;
use crate::storage::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// An in-memory [`StorageBackend`] with operation counters and a record
/// of every key written. Used to observe routing in the composite
/// backend tests: invariant checks assert which child saw which key.
#[derive(Default)]
pub struct CountingBackend {
    data: RwLock<HashMap<String, serde_json::Value>>,
    gets: AtomicU64,
    sets: AtomicU64,
    set_keys: RwLock<Vec<String>>,
}

impl CountingBackend {
    /// Create an empty counting backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls observed.
    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set` calls observed.
    pub fn sets(&self) -> u64 {
        self.sets.load(Ordering::SeqCst)
    }

    /// Every key passed to `set`, in call order.
    pub async fn set_keys(&self) -> Vec<String> {
        self.set_keys.read().await.clone()
    }
}

#[async_trait]
impl StorageBackend for CountingBackend {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.set_keys.write().await.push(key.to_owned());
        self.data.write().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.write().await.remove(key).is_some())
    }

    async fn has(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.read().await.contains_key(key))
    }

    async fn keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let data = self.data.read().await;
        Ok(data
            .keys()
            .filter(|k| prefix.is_none_or(|p| k.starts_with(p)))
            .cloned()
            .collect())
    }

    async fn clear(&self, prefix: Option<&str>) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        match prefix {
            Some(p) => data.retain(|k, _| !k.starts_with(p)),
            None => data.clear(),
        }
        Ok(())
    }

    async fn size(&self) -> Result<usize, StorageError> {
        Ok(self.data.read().await.len())
    }
}
