//! Error types for each protocol.

use thiserror::Error;

/// Agent lifecycle and message-handling errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentError {
    /// `initialize` failed. The coordinator does not install the agent.
    #[error("initialization failed: {0}")]
    InitFailed(String),

    /// `handle_message` failed. The coordinator converts this into an
    /// error-kind reply to the caller.
    #[error("message handling failed: {0}")]
    HandleFailed(String),

    /// `shutdown` failed. Logged and swallowed by the coordinator.
    #[error("shutdown failed: {0}")]
    ShutdownFailed(String),

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Coordination errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CoordError {
    /// The requested agent is not registered.
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// An agent with this name is already registered.
    #[error("agent already registered: {0}")]
    AlreadyRegistered(String),

    /// Delivery to an agent did not complete within the timeout.
    #[error("delivery to {agent} timed out after {timeout}")]
    Timeout {
        /// The agent that did not answer in time.
        agent: String,
        /// The effective timeout.
        timeout: crate::duration::DurationMs,
    },

    /// Delivery failed for a reason other than timeout.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// The requested task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// A task with this id is already queued.
    #[error("task already queued: {0}")]
    DuplicateTask(String),

    /// A state transition violated the task lifecycle.
    #[error("invalid transition for task {task}: {from} -> {to}")]
    InvalidTransition {
        /// The task whose transition was rejected.
        task: String,
        /// Status before the attempted transition.
        from: String,
        /// Status the transition attempted to reach.
        to: String,
    },

    /// `retry` was called on a task that is not retryable.
    #[error("task {0} is not retryable")]
    NotRetryable(String),

    /// An agent error propagated through coordination.
    #[error("agent error: {0}")]
    AgentError(#[from] AgentError),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Storage backend errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend failed to perform the operation.
    #[error("backend failure: {0}")]
    Backend(String),

    /// Serialization or deserialization error. Durable backends only
    /// accept values they can serialize.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Context manager errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ContextError {
    /// `repository_index` was called before an index was attached.
    #[error("repository index not set")]
    IndexNotSet,

    /// A storage error propagated through the context manager.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Adapter registry errors. Tool *call* failures are values
/// ([`crate::tool::ToolResult`]), not errors — these cover the
/// registration lifecycle.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    #[error("tool already registered: {0}")]
    AlreadyRegistered(String),

    /// An adapter's `initialize` failed.
    #[error("adapter {tool} failed to initialize: {message}")]
    InitFailed {
        /// The tool whose adapter failed.
        tool: String,
        /// The failure description.
        message: String,
    },

    /// An adapter's `shutdown` failed. Logged and swallowed by
    /// `unregister`; surfaced by `shutdown_all`.
    #[error("adapter {tool} failed to shut down: {message}")]
    ShutdownFailed {
        /// The tool whose adapter failed.
        tool: String,
        /// The failure description.
        message: String,
    },

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Event subscriber errors. These are logged but do NOT abort fan-out
/// to the other subscribers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventError {
    /// The subscriber failed to process the event.
    #[error("subscriber failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Collaborator errors — the repository index and the git/GitHub data
/// sources report failures through this type.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CollabError {
    /// The index has not been initialized yet.
    #[error("index not ready")]
    IndexNotReady,

    /// The requested entity (issue, file, symbol) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The underlying data source failed.
    #[error("source failure: {0}")]
    Source(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
