#![deny(missing_docs)]
//! In-memory implementation of relay0's StorageBackend trait.
//!
//! Uses a `HashMap` behind a `RwLock` for concurrent access. Suitable
//! for session state, testing, and single-process use cases where
//! persistence across restarts is not required.

use async_trait::async_trait;
use relay0::error::StorageError;
use relay0::storage::StorageBackend;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory storage backend backed by a `HashMap` behind a `RwLock`.
pub struct MemoryBackend {
    data: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        data.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut data = self.data.write().await;
        Ok(data.remove(key).is_some())
    }

    async fn has(&self, key: &str) -> Result<bool, StorageError> {
        let data = self.data.read().await;
        Ok(data.contains_key(key))
    }

    async fn keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let data = self.data.read().await;
        let mut keys: Vec<String> = data
            .keys()
            .filter(|k| prefix.is_none_or(|p| k.starts_with(p)))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
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
        let data = self.data.read().await;
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_roundtrip() {
        let store = MemoryBackend::new();
        store.set("key1", json!("hello")).await.unwrap();
        assert_eq!(store.get("key1").await.unwrap(), Some(json!("hello")));
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = MemoryBackend::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = MemoryBackend::new();
        store.set("key1", json!(1)).await.unwrap();
        assert!(store.delete("key1").await.unwrap());
        assert!(!store.delete("key1").await.unwrap());
        assert!(!store.has("key1").await.unwrap());
    }

    #[tokio::test]
    async fn keys_filter_by_prefix() {
        let store = MemoryBackend::new();
        store.set("user:name", json!("alice")).await.unwrap();
        store.set("user:age", json!(30)).await.unwrap();
        store.set("system:version", json!("1.0")).await.unwrap();

        let keys = store.keys(Some("user:")).await.unwrap();
        assert_eq!(keys, vec!["user:age", "user:name"]);
        assert_eq!(store.keys(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn clear_with_prefix_spares_the_rest() {
        let store = MemoryBackend::new();
        store.set("user:name", json!("alice")).await.unwrap();
        store.set("system:version", json!("1.0")).await.unwrap();

        store.clear(Some("user:")).await.unwrap();
        assert_eq!(store.size().await.unwrap(), 1);
        assert!(store.has("system:version").await.unwrap());

        store.clear(None).await.unwrap();
        assert_eq!(store.size().await.unwrap(), 0);
    }

    #[test]
    fn memory_backend_implements_storage_backend() {
        fn _assert_backend<T: StorageBackend>() {}
        _assert_backend::<MemoryBackend>();
    }
}
