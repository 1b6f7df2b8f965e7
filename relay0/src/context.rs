//! The shared-context surface agents and adapters read state through.

use crate::error::{ContextError, StorageError};
use crate::index::RepositoryIndex;
use crate::message::Message;
use async_trait::async_trait;
use std::sync::Arc;

/// The slice of the context manager that agents and tool adapters see.
///
/// The concrete owner (the context manager) exposes more — stats, clear
/// operations, lifecycle fan-out — but handlers get only this narrow
/// capability. Session state is ephemeral; persistent state survives as
/// long as its backend does. Both sides are async: a persistent backend
/// may be a filesystem or a database, and the session side follows the
/// same discipline rather than pretending to be synchronous.
#[async_trait]
pub trait SharedContext: Send + Sync {
    /// Read a session value.
    async fn session_get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Write a session value.
    async fn session_set(&self, key: &str, value: serde_json::Value)
        -> Result<(), StorageError>;

    /// Read a persistent value.
    async fn persistent_get(&self, key: &str)
        -> Result<Option<serde_json::Value>, StorageError>;

    /// Write a persistent value.
    async fn persistent_set(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StorageError>;

    /// Read the message history, most recent last. `limit` takes at most
    /// that many of the most recent entries.
    async fn history(&self, limit: Option<usize>) -> Vec<Message>;

    /// The shared repository index handle. Fails with
    /// [`ContextError::IndexNotSet`] when no index has been attached.
    async fn repository_index(&self) -> Result<Arc<dyn RepositoryIndex>, ContextError>;

    /// Whether a repository index has been attached.
    async fn has_repository_index(&self) -> bool;
}
