#![deny(missing_docs)]
//! Wiring kit for composing relay systems.
//!
//! [`System`] is the owning root value the embedder constructs: it
//! wires a context manager, a coordinator and an adapter registry from
//! one [`CoreConfig`]. There is no global state — tests build a fresh
//! system per case, and everything is dropped with it.
//!
//! This is intentionally small: it holds the assembled pieces and
//! provides the common wiring. Callers can always bypass it and wire
//! the crates directly.

use relay0::config::CoreConfig;
use relay0::error::{CoordError, RegistryError, StorageError};
use relay0::id::AgentId;
use relay0::index::RepositoryIndex;
use relay0::storage::StorageBackend;
use relay0::tool::{AdapterContext, ToolAdapter, ToolResult};
use relay0::Agent;
use relay_context::ContextManager;
use relay_coord::Coordinator;
use relay_registry::AdapterRegistry;
use relay_store_memory::MemoryBackend;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Identity the registry's adapters send as when dispatching to
/// coordinator-managed agents.
pub const TOOLS_SENDER: &str = "tools";

/// Errors from assembling or running a system.
#[derive(Debug, Error)]
pub enum SystemError {
    /// A storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// The coordinator refused an operation.
    #[error("coordination error: {0}")]
    Coord(#[from] CoordError),
    /// The adapter registry refused an operation.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Builder for a [`System`] with non-default backends or an attached
/// repository index.
pub struct SystemBuilder {
    config: CoreConfig,
    session: Option<Arc<dyn StorageBackend>>,
    persistent: Option<Arc<dyn StorageBackend>>,
    index: Option<Arc<dyn RepositoryIndex>>,
}

impl SystemBuilder {
    /// Start a builder from a config.
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            session: None,
            persistent: None,
            index: None,
        }
    }

    /// Use a custom session backend (default: in-memory).
    pub fn with_session_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.session = Some(backend);
        self
    }

    /// Use a custom persistent backend (default: in-memory).
    pub fn with_persistent_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.persistent = Some(backend);
        self
    }

    /// Attach the shared repository index handle at build time.
    pub fn with_repository_index(mut self, index: Arc<dyn RepositoryIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Assemble the system.
    pub async fn build(self) -> System {
        let session = self
            .session
            .unwrap_or_else(|| Arc::new(MemoryBackend::new()));
        let persistent = self
            .persistent
            .unwrap_or_else(|| Arc::new(MemoryBackend::new()));
        let context = Arc::new(ContextManager::with_history_capacity(
            session,
            persistent,
            self.config.history_capacity,
        ));
        if let Some(index) = self.index {
            context.set_index(index).await;
        }

        let coordinator = Coordinator::new(self.config.clone(), context.clone());
        let registry = Arc::new(AdapterRegistry::new(&self.config.rate_limit));
        System {
            config: self.config,
            context,
            coordinator,
            registry,
        }
    }
}

/// The assembled orchestration core: context manager + coordinator +
/// adapter registry, owned together.
pub struct System {
    config: CoreConfig,
    context: Arc<ContextManager>,
    coordinator: Arc<Coordinator>,
    registry: Arc<AdapterRegistry>,
}

impl System {
    /// Assemble a system with in-memory backends.
    pub async fn new(config: CoreConfig) -> Self {
        SystemBuilder::new(config).build().await
    }

    /// Start a builder for custom wiring.
    pub fn builder(config: CoreConfig) -> SystemBuilder {
        SystemBuilder::new(config)
    }

    /// The configuration this system was built from.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The shared context manager.
    pub fn context(&self) -> &Arc<ContextManager> {
        &self.context
    }

    /// The coordinator.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// The adapter registry.
    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// The capability handle adapters execute with: a sender into the
    /// coordinator plus the shared context surface.
    pub fn adapter_context(&self) -> AdapterContext {
        AdapterContext {
            sender: Some(self.coordinator.sender_for(AgentId::new(TOOLS_SENDER))),
            context: self.context.clone(),
        }
    }

    /// Register an agent with the coordinator.
    pub async fn register_agent(&self, agent: Arc<dyn Agent>) -> Result<(), SystemError> {
        self.coordinator.register_agent(agent).await?;
        Ok(())
    }

    /// Register a tool adapter with the registry.
    pub async fn register_tool(&self, adapter: Arc<dyn ToolAdapter>) -> Result<(), SystemError> {
        self.registry.register(adapter).await?;
        Ok(())
    }

    /// Execute a tool call through the registry pipeline.
    pub async fn execute_tool(&self, name: &str, args: serde_json::Value) -> ToolResult {
        self.registry
            .execute_tool(name, args, &self.adapter_context())
            .await
    }

    /// Initialize the backends and every registered adapter, then
    /// start the coordinator's periodic timers.
    pub async fn start(&self) -> Result<(), SystemError> {
        self.context.initialize().await?;
        self.registry.initialize_all(&self.adapter_context()).await?;
        self.coordinator.start();
        Ok(())
    }

    /// Stop everything: adapters first, then the coordinator (which
    /// awaits in-flight work), then the backends. Later steps run even
    /// when earlier ones fail; the first failure is returned.
    pub async fn stop(&self) -> Result<(), SystemError> {
        let registry = self.registry.shutdown_all().await;
        if let Err(e) = &registry {
            warn!(error = %e, "adapter shutdown reported a failure");
        }
        self.coordinator.stop().await;
        let storage = self.context.shutdown().await;

        registry?;
        storage?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay0::test_utils::{EchoAdapter, EchoAgent};
    use serde_json::json;

    #[tokio::test]
    async fn fresh_system_starts_and_stops() {
        let system = System::new(CoreConfig::default()).await;
        system.start().await.unwrap();
        system.stop().await.unwrap();
    }

    #[tokio::test]
    async fn tools_and_agents_compose() {
        let system = System::new(CoreConfig::default()).await;
        system
            .register_agent(Arc::new(EchoAgent::new("echo")))
            .await
            .unwrap();
        system.register_tool(Arc::new(EchoAdapter)).await.unwrap();
        system.start().await.unwrap();

        let result = system
            .execute_tool("mock_echo", json!({"message": "wired"}))
            .await;
        assert!(result.is_success());

        system.stop().await.unwrap();
    }
}
