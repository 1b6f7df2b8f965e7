#![deny(missing_docs)]
//! # relay — umbrella crate
//!
//! Provides a single import surface for the relay orchestration core.
//! Re-exports the protocol crate and the implementations behind
//! feature flags, plus a `prelude` for the happy path.

#[cfg(feature = "core")]
pub use relay0;

#[cfg(feature = "core")]
pub use relay_context;

#[cfg(feature = "coord")]
pub use relay_coord;

#[cfg(feature = "kit")]
pub use relay_kit;

#[cfg(feature = "registry")]
pub use relay_registry;

#[cfg(feature = "store-composite")]
pub use relay_store_composite;

#[cfg(feature = "store-fs")]
pub use relay_store_fs;

#[cfg(feature = "store-memory")]
pub use relay_store_memory;

/// Happy-path imports for composing relay systems.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use relay0::{
        Agent, AgentContext, AgentId, CoreConfig, DurationMs, ErrorCode, Message, MessageId,
        MessageKind, MessageSender, OutboundMessage, RepositoryIndex, SharedContext,
        StorageBackend, Task, TaskId, TaskSpec, TaskStatus, ToolAdapter, ToolDefinition,
        ToolFailure, ToolResult, ToolSchema,
    };

    #[cfg(feature = "core")]
    pub use relay_context::{CircularBuffer, ContextManager};

    #[cfg(feature = "coord")]
    pub use relay_coord::{Coordinator, EventBus, TaskQueue};

    #[cfg(feature = "registry")]
    pub use relay_registry::{AdapterRegistry, RateLimiter};

    #[cfg(feature = "store-memory")]
    pub use relay_store_memory::MemoryBackend;

    #[cfg(feature = "store-fs")]
    pub use relay_store_fs::FsBackend;

    #[cfg(feature = "store-composite")]
    pub use relay_store_composite::CompositeBackend;

    #[cfg(feature = "kit")]
    pub use relay_kit::{System, SystemBuilder};
}
