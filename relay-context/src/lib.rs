#![deny(missing_docs)]
//! Shared-context owner for relay.
//!
//! [`ContextManager`] holds the four pieces of state every handler can
//! reach: an ephemeral session store, a durable persistent store, a
//! bounded circular history of routed messages, and a nullable slot for
//! the shared repository index handle. It implements
//! [`relay0::SharedContext`], the narrow surface agents and adapters
//! actually receive.

pub mod circular;

pub use circular::CircularBuffer;

use async_trait::async_trait;
use relay0::context::SharedContext;
use relay0::error::{ContextError, StorageError};
use relay0::index::RepositoryIndex;
use relay0::message::Message;
use relay0::storage::StorageBackend;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Default capacity of the message history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// A snapshot of the context manager's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextStats {
    /// Keys in the session store.
    pub session_size: usize,
    /// Keys in the persistent store.
    pub persistent_size: usize,
    /// Messages currently in history.
    pub history_len: usize,
    /// History capacity.
    pub history_capacity: usize,
    /// Whether a repository index is attached.
    pub has_index: bool,
}

/// Owner of session state, persistent state, message history, and the
/// repository index slot.
///
/// Every key-value access is async — backends may be filesystems or
/// databases, and the session side follows the same discipline instead
/// of pretending an async store is synchronous.
pub struct ContextManager {
    session: Arc<dyn StorageBackend>,
    persistent: Arc<dyn StorageBackend>,
    history: RwLock<CircularBuffer<Message>>,
    index: RwLock<Option<Arc<dyn RepositoryIndex>>>,
}

impl ContextManager {
    /// Create a context manager over the given backends with the
    /// default history capacity (1000).
    pub fn new(session: Arc<dyn StorageBackend>, persistent: Arc<dyn StorageBackend>) -> Self {
        Self::with_history_capacity(session, persistent, DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a context manager with an explicit history capacity.
    ///
    /// # Panics
    ///
    /// Panics if `history_capacity` is zero.
    pub fn with_history_capacity(
        session: Arc<dyn StorageBackend>,
        persistent: Arc<dyn StorageBackend>,
        history_capacity: usize,
    ) -> Self {
        Self {
            session,
            persistent,
            history: RwLock::new(CircularBuffer::new(history_capacity)),
            index: RwLock::new(None),
        }
    }

    // ── session store ──────────────────────────────────────────────

    /// Read a session value.
    pub async fn session_get(
        &self,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        self.session.get(key).await
    }

    /// Write a session value.
    pub async fn session_set(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StorageError> {
        self.session.set(key, value).await
    }

    /// Delete a session value. Returns whether the key existed.
    pub async fn session_delete(&self, key: &str) -> Result<bool, StorageError> {
        self.session.delete(key).await
    }

    /// Whether a session key exists.
    pub async fn session_has(&self, key: &str) -> Result<bool, StorageError> {
        self.session.has(key).await
    }

    /// Drop all session state.
    pub async fn session_clear(&self) -> Result<(), StorageError> {
        self.session.clear(None).await
    }

    // ── persistent store ───────────────────────────────────────────

    /// Read a persistent value.
    pub async fn persistent_get(
        &self,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        self.persistent.get(key).await
    }

    /// Write a persistent value.
    pub async fn persistent_set(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StorageError> {
        self.persistent.set(key, value).await
    }

    /// Delete a persistent value. Returns whether the key existed.
    pub async fn persistent_delete(&self, key: &str) -> Result<bool, StorageError> {
        self.persistent.delete(key).await
    }

    /// List persistent keys under a prefix.
    pub async fn persistent_keys(
        &self,
        prefix: Option<&str>,
    ) -> Result<Vec<String>, StorageError> {
        self.persistent.keys(prefix).await
    }

    // ── repository index slot ──────────────────────────────────────

    /// Attach the shared repository index handle.
    pub async fn set_index(&self, index: Arc<dyn RepositoryIndex>) {
        *self.index.write().await = Some(index);
    }

    /// The attached index handle. Fails with
    /// [`ContextError::IndexNotSet`] when none is attached.
    pub async fn index(&self) -> Result<Arc<dyn RepositoryIndex>, ContextError> {
        self.index
            .read()
            .await
            .clone()
            .ok_or(ContextError::IndexNotSet)
    }

    /// Whether an index is attached.
    pub async fn has_index(&self) -> bool {
        self.index.read().await.is_some()
    }

    // ── message history ────────────────────────────────────────────

    /// Append a message to the bounded history. Never fails — when the
    /// buffer is full the oldest entry is silently overwritten.
    pub async fn add_to_history(&self, message: Message) {
        self.history.write().await.push(message);
    }

    /// Read history in insertion order. `limit` takes at most that many
    /// of the most recent messages.
    pub async fn get_history(&self, limit: Option<usize>) -> Vec<Message> {
        let history = self.history.read().await;
        match limit {
            Some(count) => history.get_recent(count),
            None => history.get_all(),
        }
    }

    /// Drop all history entries.
    pub async fn clear_history(&self) {
        self.history.write().await.clear();
    }

    // ── lifecycle ──────────────────────────────────────────────────

    /// Initialize both backends.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        self.session.initialize().await?;
        self.persistent.initialize().await?;
        debug!("context manager initialized");
        Ok(())
    }

    /// Shut down both backends. The first failure is returned after
    /// both have been attempted.
    pub async fn shutdown(&self) -> Result<(), StorageError> {
        let session = self.session.shutdown().await;
        let persistent = self.persistent.shutdown().await;
        debug!("context manager shut down");
        session.and(persistent)
    }

    /// A snapshot of sizes and slot state.
    pub async fn stats(&self) -> Result<ContextStats, StorageError> {
        let history = self.history.read().await;
        Ok(ContextStats {
            session_size: self.session.size().await?,
            persistent_size: self.persistent.size().await?,
            history_len: history.len(),
            history_capacity: history.capacity(),
            has_index: self.index.read().await.is_some(),
        })
    }
}

#[async_trait]
impl SharedContext for ContextManager {
    async fn session_get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        ContextManager::session_get(self, key).await
    }

    async fn session_set(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StorageError> {
        ContextManager::session_set(self, key, value).await
    }

    async fn persistent_get(
        &self,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        ContextManager::persistent_get(self, key).await
    }

    async fn persistent_set(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StorageError> {
        ContextManager::persistent_set(self, key, value).await
    }

    async fn history(&self, limit: Option<usize>) -> Vec<Message> {
        self.get_history(limit).await
    }

    async fn repository_index(&self) -> Result<Arc<dyn RepositoryIndex>, ContextError> {
        self.index().await
    }

    async fn has_repository_index(&self) -> bool {
        self.has_index().await
    }
}
