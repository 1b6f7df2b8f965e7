//! SleepyAgent — delays before echoing. Used for timeout tests.

use crate::agent::{Agent, AgentContext};
use crate::duration::DurationMs;
use crate::error::AgentError;
use crate::message::{Message, MessageKind};
use async_trait::async_trait;

/// An agent that sleeps for a fixed delay before echoing the request
/// payload. Drive it with a short coordinator timeout to exercise the
/// timeout path.
pub struct SleepyAgent {
    name: String,
    capabilities: Vec<String>,
    delay: DurationMs,
}

impl SleepyAgent {
    /// Create a sleepy agent with the given name and delay.
    pub fn new(name: impl Into<String>, delay: DurationMs) -> Self {
        Self {
            name: name.into(),
            capabilities: vec!["slow".to_owned()],
            delay,
        }
    }
}

#[async_trait]
impl Agent for SleepyAgent {
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
        tokio::time::sleep(self.delay.to_std()).await;
        Ok(Some(Message::response_to(message, message.payload.clone())))
    }
}
