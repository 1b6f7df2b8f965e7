//! EchoAgent — answers every request with its own payload.

use crate::agent::{Agent, AgentContext};
use crate::error::AgentError;
use crate::message::{Message, MessageKind};
use async_trait::async_trait;

/// An agent that echoes request payloads back as responses.
/// Used for testing routing, timeouts, and task dispatch.
pub struct EchoAgent {
    name: String,
    capabilities: Vec<String>,
}

impl EchoAgent {
    /// Create an echo agent with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: vec!["echo".to_owned()],
        }
    }
}

#[async_trait]
impl Agent for EchoAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    async fn initialize(&self, _ctx: AgentContext) -> Result<(), AgentError> {
        Ok(())
    }

    async fn handle_message(&self, message: &Message) -> Result<Option<Message>, AgentError> {
        if message.kind != MessageKind::Request {
            return Ok(None);
        }
        Ok(Some(Message::response_to(message, message.payload.clone())))
    }
}
