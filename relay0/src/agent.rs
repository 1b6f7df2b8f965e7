//! The Agent protocol — named recipients of routed messages.

use crate::context::SharedContext;
use crate::error::AgentError;
use crate::id::AgentId;
use crate::message::{Message, OutboundMessage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where an agent is in its life with a coordinator.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Accepted for registration; `initialize` not yet complete.
    Registered,
    /// `initialize` succeeded; the agent receives messages.
    Initialized,
    /// `shutdown` in progress.
    ShuttingDown,
    /// Removed from the coordinator.
    Unregistered,
}

/// A static description of a registered agent.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// The agent's unique name within its coordinator.
    pub name: AgentId,
    /// Free-form capability tags, used for discovery.
    pub capabilities: Vec<String>,
    /// Current lifecycle state.
    pub state: LifecycleState,
}

impl AgentDescriptor {
    /// Build a descriptor from its fields.
    pub fn new(name: AgentId, capabilities: Vec<String>, state: LifecycleState) -> Self {
        Self {
            name,
            capabilities,
            state,
        }
    }
}

/// The capability handle an agent receives at registration.
///
/// This is how the Arc cycle between agents and the coordinator is
/// broken: agents never hold the coordinator itself, only a sending
/// capability already scoped to their own name, plus the shared-context
/// surface. Dropping the coordinator invalidates the capability; sends
/// after that produce synthetic error replies.
#[derive(Clone)]
pub struct AgentContext {
    /// The agent's own name. Outgoing messages carry it as the sender.
    pub agent: AgentId,
    /// Scoped sending capability.
    pub sender: Arc<dyn MessageSender>,
    /// Shared state surface (session, persistent, history, index).
    pub context: Arc<dyn SharedContext>,
}

impl AgentContext {
    /// Send a message to another agent and wait for the reply (or a
    /// synthetic error).
    pub async fn send(&self, outbound: OutboundMessage) -> Message {
        self.sender.send(outbound).await
    }

    /// Broadcast to every other registered agent; collects the non-null
    /// replies.
    pub async fn broadcast(&self, outbound: OutboundMessage) -> Vec<Message> {
        self.sender.broadcast(outbound).await
    }
}

/// A sending capability bound to one sender identity.
///
/// The coordinator hands each agent (and the adapter layer) an
/// implementation that stamps ids, timestamps, and the fixed sender
/// name. `send` never fails at the Rust level — misses, timeouts and
/// handler errors all come back as an error-kind [`Message`] so callers
/// handle one shape.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Deliver a request and wait for the reply.
    async fn send(&self, outbound: OutboundMessage) -> Message;

    /// Deliver to every registered agent except the sender. The
    /// recipient field of the draft is ignored.
    async fn broadcast(&self, outbound: OutboundMessage) -> Vec<Message>;
}

/// Protocol — the Agent.
///
/// An agent is a named message handler with a lifecycle. The contract:
///
/// - Non-request messages should be ignored (return `Ok(None)`).
/// - A request must yield either a response with `correlation_id ==
///   request.id` and kind `response`, or an error message with the same
///   correlation id and kind `error`. [`Message::response_to`] and
///   [`Message::error_to`] produce both correctly.
/// - Handlers must not mutate the input message (they can't — they get a
///   shared reference and `Message` has no interior mutability).
/// - The payload type is agent-specific: each implementation documents
///   the closed set of request/response shapes it understands.
///
/// Implementations in a tool server: a search agent over the repository
/// index, a planning agent, a git-history agent, a GitHub-context agent.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The agent's unique name within a coordinator.
    fn name(&self) -> &str;

    /// Free-form capability tags, used for discovery and diagnostics.
    fn capabilities(&self) -> &[String];

    /// Called once at registration. Failure aborts the registration —
    /// the agent is not installed and the error surfaces to the caller.
    async fn initialize(&self, ctx: AgentContext) -> Result<(), AgentError>;

    /// Handle one routed message. `Ok(None)` means "nothing to say"
    /// (events, ignored kinds). Errors become error-kind replies.
    async fn handle_message(&self, message: &Message) -> Result<Option<Message>, AgentError>;

    /// Liveness probe, called by the coordinator's periodic health
    /// check. A `false` is logged, never fatal.
    async fn health_check(&self) -> bool {
        true
    }

    /// Called at unregistration and coordinator stop. Failures are
    /// logged and swallowed; removal proceeds regardless.
    async fn shutdown(&self) -> Result<(), AgentError> {
        Ok(())
    }
}
