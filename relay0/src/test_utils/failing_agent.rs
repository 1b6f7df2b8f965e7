//! FailingAgent — replies with error-kind messages, optionally
//! succeeding after a configured number of failures.

use crate::agent::{Agent, AgentContext};
use crate::error::AgentError;
use crate::message::{Message, MessageKind};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};

/// An agent that fails its first N requests (error-kind replies), then
/// echoes. `fail_times = u32::MAX` fails forever. Used for testing task
/// retry and terminal failure accounting.
pub struct FailingAgent {
    name: String,
    capabilities: Vec<String>,
    fail_times: u32,
    attempts: AtomicU32,
}

impl FailingAgent {
    /// An agent that always fails.
    pub fn new(name: impl Into<String>) -> Self {
        Self::failing_first(name, u32::MAX)
    }

    /// An agent that fails the first `fail_times` requests.
    pub fn failing_first(name: impl Into<String>, fail_times: u32) -> Self {
        Self {
            name: name.into(),
            capabilities: vec!["flaky".to_owned()],
            fail_times,
            attempts: AtomicU32::new(0),
        }
    }

    /// How many requests this agent has seen.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for FailingAgent {
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
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_times {
            return Ok(Some(Message::error_to(
                message,
                json!({"error": format!("simulated failure {}", attempt + 1)}),
            )));
        }
        Ok(Some(Message::response_to(message, message.payload.clone())))
    }
}
