//! The Storage protocol — async key-value backends for shared state.

use crate::error::StorageError;
use async_trait::async_trait;

/// An async key-value backend.
///
/// Values are opaque JSON to the backend. A backend marketed as durable
/// must only accept values it can serialize — the in-memory backend
/// accepts anything, the filesystem backend rejects what it cannot
/// round-trip.
///
/// Implementations:
/// - MemoryBackend: HashMap (session state, testing)
/// - FsBackend: one JSON file per key (durable persistent state)
/// - CompositeBackend: routes keys by prefix to two children
///
/// The trait is deliberately minimal — CRUD plus prefix listing.
/// Namespacing conventions (e.g. the `orch:*` keys the core itself
/// writes) live above this trait, not in it.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read a value. Returns None if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Write a value. Creates or overwrites.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError>;

    /// Delete a value. Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Whether a key exists.
    async fn has(&self, key: &str) -> Result<bool, StorageError>;

    /// List keys, optionally restricted to a prefix.
    async fn keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError>;

    /// Remove all keys, or all keys under a prefix.
    async fn clear(&self, prefix: Option<&str>) -> Result<(), StorageError>;

    /// Number of stored keys.
    async fn size(&self) -> Result<usize, StorageError>;

    /// One-time setup (open files, connect). Default: nothing.
    async fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Flush and release resources. Default: nothing.
    async fn shutdown(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
