#![deny(missing_docs)]
//! Composite StorageBackend that routes keys to two children by prefix.
//!
//! `session:KEY` goes to the session child as `KEY`, `persistent:KEY`
//! to the persistent child as `KEY`, and any other key defaults to the
//! session child unchanged. `keys()` reports prefixed keys drawn from
//! both children, so a composite listing can be routed back through the
//! same rules.

use async_trait::async_trait;
use relay0::error::StorageError;
use relay0::storage::StorageBackend;
use std::sync::Arc;

const SESSION_PREFIX: &str = "session:";
const PERSISTENT_PREFIX: &str = "persistent:";

/// Which child a key routes to, plus the key the child sees.
enum Route<'a> {
    Session(&'a str),
    Persistent(&'a str),
}

fn route(key: &str) -> Route<'_> {
    if let Some(rest) = key.strip_prefix(PERSISTENT_PREFIX) {
        Route::Persistent(rest)
    } else if let Some(rest) = key.strip_prefix(SESSION_PREFIX) {
        Route::Session(rest)
    } else {
        Route::Session(key)
    }
}

/// A storage backend composed of a session child and a persistent
/// child, routed by key prefix.
pub struct CompositeBackend {
    session: Arc<dyn StorageBackend>,
    persistent: Arc<dyn StorageBackend>,
}

impl CompositeBackend {
    /// Compose a session child and a persistent child.
    pub fn new(session: Arc<dyn StorageBackend>, persistent: Arc<dyn StorageBackend>) -> Self {
        Self {
            session,
            persistent,
        }
    }

    fn child(&self, key: &str) -> (&Arc<dyn StorageBackend>, String) {
        match route(key) {
            Route::Session(rest) => (&self.session, rest.to_owned()),
            Route::Persistent(rest) => (&self.persistent, rest.to_owned()),
        }
    }
}

#[async_trait]
impl StorageBackend for CompositeBackend {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let (child, key) = self.child(key);
        child.get(&key).await
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        let (child, key) = self.child(key);
        child.set(&key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let (child, key) = self.child(key);
        child.delete(&key).await
    }

    async fn has(&self, key: &str) -> Result<bool, StorageError> {
        let (child, key) = self.child(key);
        child.has(&key).await
    }

    async fn keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self
            .session
            .keys(None)
            .await?
            .into_iter()
            .map(|k| format!("{SESSION_PREFIX}{k}"))
            .chain(
                self.persistent
                    .keys(None)
                    .await?
                    .into_iter()
                    .map(|k| format!("{PERSISTENT_PREFIX}{k}")),
            )
            .filter(|k| prefix.is_none_or(|p| k.starts_with(p)))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self, prefix: Option<&str>) -> Result<(), StorageError> {
        match prefix {
            None => {
                self.session.clear(None).await?;
                self.persistent.clear(None).await
            }
            Some(p) => {
                if let Some(rest) = p.strip_prefix(PERSISTENT_PREFIX) {
                    let rest = (!rest.is_empty()).then_some(rest);
                    self.persistent.clear(rest).await
                } else if let Some(rest) = p.strip_prefix(SESSION_PREFIX) {
                    let rest = (!rest.is_empty()).then_some(rest);
                    self.session.clear(rest).await
                } else {
                    self.session.clear(Some(p)).await
                }
            }
        }
    }

    async fn size(&self) -> Result<usize, StorageError> {
        Ok(self.session.size().await? + self.persistent.size().await?)
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        self.session.initialize().await?;
        self.persistent.initialize().await
    }

    async fn shutdown(&self) -> Result<(), StorageError> {
        let session = self.session.shutdown().await;
        let persistent = self.persistent.shutdown().await;
        session.and(persistent)
    }
}
