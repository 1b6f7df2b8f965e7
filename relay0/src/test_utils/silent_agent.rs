//! SilentAgent — never answers. Used for null-reply handling tests.

use crate::agent::{Agent, AgentContext};
use crate::error::AgentError;
use crate::message::Message;
use async_trait::async_trait;

/// An agent that returns `None` for every message, including requests.
pub struct SilentAgent {
    name: String,
    capabilities: Vec<String>,
}

impl SilentAgent {
    /// Create a silent agent with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: vec![],
        }
    }
}

#[async_trait]
impl Agent for SilentAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    async fn initialize(&self, _ctx: AgentContext) -> Result<(), AgentError> {
        Ok(())
    }

    async fn handle_message(&self, _message: &Message) -> Result<Option<Message>, AgentError> {
        Ok(None)
    }
}
