//! # relay0 — Protocol traits for an agent and tool orchestration core
//!
//! This crate defines the protocol boundaries that compose to form the
//! orchestration substrate of a developer-assistant tool server.
//!
//! ## The Protocols
//!
//! | Protocol | Trait | What it does |
//! |----------|-------|-------------|
//! | ① Agent | [`Agent`] | Named handler of routed messages, with a lifecycle |
//! | ② Tool | [`ToolAdapter`] | One schema-validated operation exposed to callers |
//! | ③ Storage | [`StorageBackend`] | How shared key-value state persists |
//! | ④ Context | [`SharedContext`] | The state surface handlers read through |
//!
//! ## The Collaborators
//!
//! | Interface | Trait | Who implements it |
//! |-----------|-------|-------------------|
//! | Semantic search | [`RepositoryIndex`] | The embedder's vector index |
//! | Git history | [`GitSource`] | A `git log` extractor |
//! | Forge context | [`GitHubSource`] | A GitHub CLI fetcher |
//!
//! ## Design Principle
//!
//! Every protocol trait is operation-defined, not mechanism-defined.
//! [`Agent::handle_message`] means "cause this agent to process one
//! message" — not "call a function" or "hop the network." This is what
//! makes implementations swappable behind a coordinator.
//!
//! ## Dependency Notes
//!
//! This crate depends on `serde_json::Value` for extension data fields
//! (message payloads, tool arguments, search metadata). This is an
//! intentional choice: JSON is the universal interchange format for
//! agentic systems, and `serde_json::Value` is the de facto standard in
//! the Rust ecosystem. The alternative (generic `T: Serialize`) would
//! complicate trait object safety without practical benefit.

#![deny(missing_docs)]

pub mod agent;
pub mod config;
pub mod context;
pub mod duration;
pub mod error;
pub mod id;
pub mod index;
pub mod message;
pub mod sources;
pub mod storage;
pub mod task;
pub mod tool;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use agent::{Agent, AgentContext, AgentDescriptor, LifecycleState, MessageSender};
pub use config::{CoreConfig, LogLevel, RateLimitConfig};
pub use context::SharedContext;
pub use duration::DurationMs;
pub use error::{
    AgentError, CollabError, ContextError, CoordError, EventError, RegistryError, StorageError,
};
pub use id::{AgentId, MessageId, SubscriptionId, TaskId};
pub use index::{IndexStats, RepositoryIndex, SearchHit, SearchOptions};
pub use message::{Message, MessageKind, OutboundMessage, DEFAULT_PRIORITY};
pub use sources::{
    CommitFilter, GhDocType, GhDocument, GhIndexOptions, GhState, GitCommit, GitHubSource,
    GitSource,
};
pub use storage::StorageBackend;
pub use task::{Task, TaskSpec, TaskStatus};
pub use tool::{
    dispatch_to_agent, AdapterContext, AdapterMetadata, ErrorCode, PropKind, PropertySchema,
    ResultMeta, ToolAdapter, ToolDefinition, ToolFailure, ToolResult, ToolSchema, Validation,
};
