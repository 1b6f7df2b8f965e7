//! StubContext — a self-contained [`SharedContext`] for unit tests that
//! don't need a full context manager.

use crate::context::SharedContext;
use crate::error::{ContextError, StorageError};
use crate::index::RepositoryIndex;
use crate::message::Message;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A [`SharedContext`] backed by two plain HashMaps and an unbounded
/// message list. Only for tests — the real owner is the context
/// manager, which bounds its history.
#[derive(Default)]
pub struct StubContext {
    session: RwLock<HashMap<String, serde_json::Value>>,
    persistent: RwLock<HashMap<String, serde_json::Value>>,
    history: RwLock<Vec<Message>>,
    index: RwLock<Option<Arc<dyn RepositoryIndex>>>,
}

impl StubContext {
    /// Create an empty stub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a repository index handle.
    pub async fn set_index(&self, index: Arc<dyn RepositoryIndex>) {
        *self.index.write().await = Some(index);
    }

    /// Append a message to the stub history.
    pub async fn push_history(&self, message: Message) {
        self.history.write().await.push(message);
    }
}

#[async_trait]
impl SharedContext for StubContext {
    async fn session_get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(self.session.read().await.get(key).cloned())
    }

    async fn session_set(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StorageError> {
        self.session.write().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn persistent_get(
        &self,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(self.persistent.read().await.get(key).cloned())
    }

    async fn persistent_set(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StorageError> {
        self.persistent.write().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn history(&self, limit: Option<usize>) -> Vec<Message> {
        let history = self.history.read().await;
        match limit {
            Some(n) if n < history.len() => history[history.len() - n..].to_vec(),
            _ => history.clone(),
        }
    }

    async fn repository_index(&self) -> Result<Arc<dyn RepositoryIndex>, ContextError> {
        self.index
            .read()
            .await
            .clone()
            .ok_or(ContextError::IndexNotSet)
    }

    async fn has_repository_index(&self) -> bool {
        self.index.read().await.is_some()
    }
}
