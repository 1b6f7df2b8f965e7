#![deny(missing_docs)]
//! Filesystem-backed implementation of relay0's StorageBackend trait.
//!
//! Keys are URL-encoded and stored as `.json` files under the root
//! directory. Provides true persistence across process restarts — the
//! natural "persistent" child for a composite store. Only values that
//! serialize as JSON are accepted, which is every `serde_json::Value`.

use async_trait::async_trait;
use relay0::error::StorageError;
use relay0::storage::StorageBackend;
use std::path::{Path, PathBuf};

/// Filesystem-backed storage.
///
/// Directory layout:
/// ```text
/// root/
///   <url-encoded-key>.json
/// ```
///
/// Suitable for development, single-machine deployments, and cases
/// where data must survive process restarts without a database.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Create a new filesystem backend rooted at the given directory.
    ///
    /// The directory is created lazily on first write.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key_to_filename(key))
    }

    async fn stored_keys(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StorageError::Backend(e.to_string())),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
        {
            if let Some(filename) = entry.file_name().to_str() {
                if let Some(key) = filename_to_key(filename) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

/// Encode a key into a safe filename.
fn key_to_filename(key: &str) -> String {
    let mut encoded = String::new();
    for ch in key.chars() {
        match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => encoded.push(ch),
            _ => {
                for byte in ch.to_string().as_bytes() {
                    encoded.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    format!("{encoded}.json")
}

/// Decode a filename back to a key.
fn filename_to_key(filename: &str) -> Option<String> {
    let name = filename.strip_suffix(".json")?;
    let mut result = Vec::new();
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;
            let byte = u8::from_str_radix(hex, 16).ok()?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(result).ok()
}

#[async_trait]
impl StorageBackend for FsBackend {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => {
                let value: serde_json::Value = serde_json::from_str(&contents)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let contents = serde_json::to_string_pretty(&value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        tokio::fs::write(self.path_for(key), contents)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }

    async fn has(&self, key: &str) -> Result<bool, StorageError> {
        match tokio::fs::metadata(self.path_for(key)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }

    async fn keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self
            .stored_keys()
            .await?
            .into_iter()
            .filter(|k| prefix.is_none_or(|p| k.starts_with(p)))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self, prefix: Option<&str>) -> Result<(), StorageError> {
        for key in self.stored_keys().await? {
            if prefix.is_none_or(|p| key.starts_with(p)) {
                self.delete(&key).await?;
            }
        }
        Ok(())
    }

    async fn size(&self) -> Result<usize, StorageError> {
        Ok(self.stored_keys().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_encoding_roundtrip() {
        let keys = [
            "simple",
            "user:name",
            "path/to/key",
            "has spaces",
            "emoji🎉",
        ];
        for key in &keys {
            let filename = key_to_filename(key);
            let decoded = filename_to_key(&filename).unwrap();
            assert_eq!(*key, decoded, "roundtrip failed for {key}");
        }
    }

    #[test]
    fn key_to_filename_produces_json_extension() {
        assert!(key_to_filename("test").ends_with(".json"));
    }

    #[test]
    fn filename_to_key_rejects_non_json() {
        assert!(filename_to_key("test.txt").is_none());
    }

    #[tokio::test]
    async fn write_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBackend::new(dir.path());

        store.set("key1", json!({"nested": [1, 2]})).await.unwrap();
        assert_eq!(
            store.get("key1").await.unwrap(),
            Some(json!({"nested": [1, 2]}))
        );
    }

    #[tokio::test]
    async fn read_nonexistent_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBackend::new(dir.path());
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBackend::new(dir.path());

        store.set("key1", json!("hello")).await.unwrap();
        assert!(store.delete("key1").await.unwrap());
        assert!(!store.delete("key1").await.unwrap());
        assert_eq!(store.get("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_with_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBackend::new(dir.path());

        store.set("user:name", json!("alice")).await.unwrap();
        store.set("user:age", json!(30)).await.unwrap();
        store.set("system:version", json!("1.0")).await.unwrap();

        let keys = store.keys(Some("user:")).await.unwrap();
        assert_eq!(keys, vec!["user:age", "user:name"]);
    }

    #[tokio::test]
    async fn keys_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBackend::new(&dir.path().join("never-written"));
        assert!(store.keys(None).await.unwrap().is_empty());
        assert_eq!(store.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_with_prefix_spares_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBackend::new(dir.path());

        store.set("user:name", json!("alice")).await.unwrap();
        store.set("system:version", json!("1.0")).await.unwrap();

        store.clear(Some("user:")).await.unwrap();
        assert_eq!(store.size().await.unwrap(), 1);
        assert!(store.has("system:version").await.unwrap());
    }

    #[tokio::test]
    async fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FsBackend::new(dir.path());
            store.set("durable", json!(42)).await.unwrap();
        }
        let reopened = FsBackend::new(dir.path());
        assert_eq!(reopened.get("durable").await.unwrap(), Some(json!(42)));
    }

    #[test]
    fn fs_backend_implements_storage_backend() {
        fn _assert_backend<T: StorageBackend>() {}
        _assert_backend::<FsBackend>();
    }
}
