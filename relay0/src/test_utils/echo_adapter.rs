//! EchoAdapter — the `mock_echo` tool used across registry tests.

use crate::error::RegistryError;
use crate::tool::{
    AdapterContext, AdapterMetadata, PropertySchema, ToolAdapter, ToolDefinition, ToolResult,
    ToolSchema, Validation,
};
use async_trait::async_trait;
use serde_json::json;

/// A tool adapter exposing `mock_echo`: requires a string `message` and
/// returns `{"echo": message}`. Its `validate` rejects non-string
/// messages, naming the offending property.
pub struct EchoAdapter;

#[async_trait]
impl ToolAdapter for EchoAdapter {
    fn metadata(&self) -> AdapterMetadata {
        AdapterMetadata::new("mock_echo", "0.1.0", "Echoes its message argument back")
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "mock_echo",
            "Echo a message back to the caller",
            ToolSchema::new()
                .property("message", PropertySchema::string("the text to echo"))
                .required(["message"]),
        )
    }

    fn validate(&self, args: &serde_json::Value) -> Option<Validation> {
        match args.get("message") {
            Some(serde_json::Value::String(_)) => Some(Validation::ok()),
            Some(other) => Some(
                Validation::fail("message must be a string")
                    .with_details(json!({"message": other})),
            ),
            None => Some(Validation::fail("message is required")),
        }
    }

    fn estimate_tokens(&self, args: &serde_json::Value) -> Option<u64> {
        args.get("message")
            .and_then(|m| m.as_str())
            .map(|s| (s.len() / 4) as u64 + 1)
    }

    async fn initialize(&self, _ctx: AdapterContext) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn execute(&self, args: serde_json::Value, _ctx: AdapterContext) -> ToolResult {
        let message = args
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default();
        ToolResult::success(json!({"echo": message}))
    }
}
