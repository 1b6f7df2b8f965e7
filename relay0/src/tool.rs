//! The ToolAdapter protocol — one named, argument-validated operation
//! exposed to an external caller.

use crate::context::SharedContext;
use crate::error::RegistryError;
use crate::agent::MessageSender;
use crate::id::AgentId;
use crate::message::{now_epoch_ms, Message, MessageKind, OutboundMessage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Stable error codes carried by tool failures and error-kind messages.
///
/// The string forms are wire-stable — clients switch on them. `429`
/// deliberately matches the HTTP status text the source protocol used
/// for rate-limit denials.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// Registry lookup miss.
    ToolNotFound,
    /// Schema or validator rejection.
    InvalidParams,
    /// Token bucket denial.
    RateLimited,
    /// Unhandled adapter failure.
    ToolExecutionError,
    /// The repository index is not initialized.
    IndexNotReady,
    /// Domain lookup miss (issue, file, symbol).
    NotFound,
    /// The coordinator timed out waiting for an agent.
    Timeout,
    /// A message was sent to an unknown recipient.
    AgentNotFound,
    /// Tool-specific code, passed through verbatim.
    Custom(String),
}

impl ErrorCode {
    /// The wire-stable string form.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::ToolNotFound => "TOOL_NOT_FOUND",
            ErrorCode::InvalidParams => "INVALID_PARAMS",
            ErrorCode::RateLimited => "429",
            ErrorCode::ToolExecutionError => "TOOL_EXECUTION_ERROR",
            ErrorCode::IndexNotReady => "INDEX_NOT_READY",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::AgentNotFound => "AGENT_NOT_FOUND",
            ErrorCode::Custom(code) => code,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        match s {
            "TOOL_NOT_FOUND" => ErrorCode::ToolNotFound,
            "INVALID_PARAMS" => ErrorCode::InvalidParams,
            "429" => ErrorCode::RateLimited,
            "TOOL_EXECUTION_ERROR" => ErrorCode::ToolExecutionError,
            "INDEX_NOT_READY" => ErrorCode::IndexNotReady,
            "NOT_FOUND" => ErrorCode::NotFound,
            "TIMEOUT" => ErrorCode::Timeout,
            "AGENT_NOT_FOUND" => ErrorCode::AgentNotFound,
            other => ErrorCode::Custom(other.to_owned()),
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ErrorCode::from(s.as_str()))
    }
}

/// The error half of a tool result.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFailure {
    /// Stable code the client switches on.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional structured detail (offending property, limits...).
    pub details: Option<serde_json::Value>,
    /// Whether retrying (possibly after fixing args or waiting) can
    /// succeed.
    pub recoverable: bool,
    /// Optional hint telling the caller how to recover.
    pub remediation: Option<String>,
}

impl ToolFailure {
    /// Create a failure with a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            recoverable: true,
            remediation: None,
        }
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark the failure unrecoverable.
    pub fn unrecoverable(mut self) -> Self {
        self.recoverable = false;
        self
    }

    /// Attach a remediation hint.
    pub fn with_remediation(mut self, hint: impl Into<String>) -> Self {
        self.remediation = Some(hint.into());
        self
    }
}

/// Execution metadata attached to successful tool results.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMeta {
    /// Approximate token count of the payload, if estimated.
    pub tokens: Option<u64>,
    /// Wall-clock execution time. The registry backfills this when the
    /// adapter leaves it unset.
    pub duration_ms: Option<u64>,
    /// When the result was produced, milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Whether the result came from a cache.
    pub cache_hit: bool,
    /// Total matching items before any truncation.
    pub total: Option<u64>,
    /// Whether the payload was truncated to fit a limit.
    pub truncated: Option<bool>,
}

impl Default for ResultMeta {
    fn default() -> Self {
        Self {
            tokens: None,
            duration_ms: None,
            timestamp: now_epoch_ms(),
            cache_hit: false,
            total: None,
            truncated: None,
        }
    }
}

/// The outcome of one tool call. Failures are values, not `Err` — the
/// registry never propagates a Rust error for a tool-level failure.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    /// The call succeeded.
    Success {
        /// The formatted tool output.
        payload: serde_json::Value,
        /// Execution metadata.
        meta: ResultMeta,
    },
    /// The call failed.
    Failure {
        /// What went wrong and whether retrying can help.
        error: ToolFailure,
    },
}

impl ToolResult {
    /// A successful result with default metadata.
    pub fn success(payload: serde_json::Value) -> Self {
        ToolResult::Success {
            payload,
            meta: ResultMeta::default(),
        }
    }

    /// A failed result.
    pub fn failure(error: ToolFailure) -> Self {
        ToolResult::Failure { error }
    }

    /// Whether this is the success variant.
    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&ToolFailure> {
        match self {
            ToolResult::Failure { error } => Some(error),
            ToolResult::Success { .. } => None,
        }
    }
}

/// Identity of an adapter, independent of its tool schema.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterMetadata {
    /// Adapter name (usually matches the tool name).
    pub name: String,
    /// Semantic version of the adapter.
    pub version: String,
    /// One-line description.
    pub description: String,
}

impl AdapterMetadata {
    /// Create adapter metadata.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
        }
    }
}

/// Primitive type of a schema property.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropKind {
    /// JSON string.
    String,
    /// JSON integer (a number with no fractional part).
    Integer,
    /// Any JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

impl PropKind {
    /// The JSON-Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropKind::String => "string",
            PropKind::Integer => "integer",
            PropKind::Number => "number",
            PropKind::Boolean => "boolean",
            PropKind::Array => "array",
            PropKind::Object => "object",
        }
    }
}

/// One typed property in a tool's input schema.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    /// The property's primitive type.
    pub kind: PropKind,
    /// Human description shown to the calling model.
    pub description: Option<String>,
    /// Closed set of allowed values, if any.
    pub one_of: Option<Vec<serde_json::Value>>,
    /// Inclusive lower bound for numeric properties.
    pub minimum: Option<f64>,
    /// Inclusive upper bound for numeric properties.
    pub maximum: Option<f64>,
}

impl PropertySchema {
    /// A property of the given type with no constraints.
    pub fn of(kind: PropKind) -> Self {
        Self {
            kind,
            description: None,
            one_of: None,
            minimum: None,
            maximum: None,
        }
    }

    /// A string property with a description.
    pub fn string(description: impl Into<String>) -> Self {
        Self::of(PropKind::String).describe(description)
    }

    /// An integer property with a description.
    pub fn integer(description: impl Into<String>) -> Self {
        Self::of(PropKind::Integer).describe(description)
    }

    /// A boolean property with a description.
    pub fn boolean(description: impl Into<String>) -> Self {
        Self::of(PropKind::Boolean).describe(description)
    }

    /// Set the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restrict the property to a closed set of values.
    pub fn one_of(mut self, values: Vec<serde_json::Value>) -> Self {
        self.one_of = Some(values);
        self
    }

    /// Set an inclusive numeric range. Either bound may be None.
    pub fn range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }
}

/// Declarative input schema for a tool: typed properties, a required
/// list, enumerations, numeric bounds. Registered once, validated by
/// the registry on every call.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Properties by name. Ordered for stable listings.
    pub properties: BTreeMap<String, PropertySchema>,
    /// Names of required properties.
    pub required: Vec<String>,
}

impl ToolSchema {
    /// An empty object schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property.
    pub fn property(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Mark properties required.
    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Render as a JSON-Schema object for transport to clients.
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for (name, prop) in &self.properties {
            let mut p = serde_json::Map::new();
            p.insert("type".into(), prop.kind.as_str().into());
            if let Some(desc) = &prop.description {
                p.insert("description".into(), desc.clone().into());
            }
            if let Some(values) = &prop.one_of {
                p.insert("enum".into(), serde_json::Value::Array(values.clone()));
            }
            if let Some(min) = prop.minimum {
                p.insert("minimum".into(), min.into());
            }
            if let Some(max) = prop.maximum {
                p.insert("maximum".into(), max.into());
            }
            properties.insert(name.clone(), serde_json::Value::Object(p));
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }
}

/// The declarative description of one tool.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name, unique within a registry.
    pub name: String,
    /// Human description shown to the calling model.
    pub description: String,
    /// Declarative input schema.
    pub input_schema: ToolSchema,
    /// Optional output schema, for clients that want it.
    pub output_schema: Option<serde_json::Value>,
}

impl ToolDefinition {
    /// Create a tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: ToolSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            output_schema: None,
        }
    }
}

/// Outcome of an adapter's custom argument validation.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    /// Whether the arguments are acceptable.
    pub valid: bool,
    /// Human-readable rejection reason.
    pub error: Option<String>,
    /// Structured detail about the rejection.
    pub details: Option<serde_json::Value>,
}

impl Validation {
    /// Arguments accepted.
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
            details: None,
        }
    }

    /// Arguments rejected with a reason.
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            details: None,
        }
    }

    /// Attach structured detail to a rejection.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// The capability handle adapters execute with.
///
/// `sender` is present when a coordinator backs the registry — adapters
/// dispatch to agents through it. When it's absent (registry running
/// standalone), [`dispatch_to_agent`] returns None and the adapter
/// falls back to its direct code path.
#[derive(Clone)]
pub struct AdapterContext {
    /// Sending capability into the coordinator, if one is attached.
    pub sender: Option<Arc<dyn MessageSender>>,
    /// Shared state surface (session, persistent, history, index).
    pub context: Arc<dyn SharedContext>,
}

/// Dispatch a request to a coordinator-managed agent and wait for the
/// reply. Returns None when no coordinator is attached or the reply is
/// not a usable response — the adapter then takes its direct path.
pub async fn dispatch_to_agent(
    ctx: &AdapterContext,
    agent: &AgentId,
    payload: serde_json::Value,
) -> Option<Message> {
    let sender = ctx.sender.as_ref()?;
    let reply = sender
        .send(OutboundMessage::request(agent.clone(), payload))
        .await;
    match reply.kind {
        MessageKind::Response | MessageKind::Error => Some(reply),
        _ => None,
    }
}

/// Protocol — the ToolAdapter.
///
/// An adapter exposes exactly one tool: a declarative schema plus an
/// execute operation. The registry fronts every call with rate
/// limiting, schema validation and error wrapping, so `execute` only
/// sees arguments that passed the declared schema (and the adapter's
/// own `validate`, when it has one).
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Adapter identity.
    fn metadata(&self) -> AdapterMetadata;

    /// The tool this adapter exposes. The registry keys on
    /// `definition().name`.
    fn definition(&self) -> ToolDefinition;

    /// Custom argument validation, run after the schema check.
    /// None (the default) means schema validation alone decides.
    fn validate(&self, args: &serde_json::Value) -> Option<Validation> {
        let _ = args;
        None
    }

    /// Approximate token cost of a call with these arguments. Used to
    /// fill result metadata when the adapter doesn't.
    fn estimate_tokens(&self, args: &serde_json::Value) -> Option<u64> {
        let _ = args;
        None
    }

    /// Called once by `initialize_all`. Default: nothing.
    async fn initialize(&self, ctx: AdapterContext) -> Result<(), RegistryError> {
        let _ = ctx;
        Ok(())
    }

    /// Execute the tool. Failures should be returned as
    /// [`ToolResult::Failure`]; anything that escapes (including a
    /// panic) is wrapped by the registry as `TOOL_EXECUTION_ERROR`.
    async fn execute(&self, args: serde_json::Value, ctx: AdapterContext) -> ToolResult;

    /// Called at unregistration and `shutdown_all`. Default: nothing.
    async fn shutdown(&self) -> Result<(), RegistryError> {
        Ok(())
    }

    /// Liveness probe. Default: healthy.
    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_code_strings_are_stable() {
        assert_eq!(ErrorCode::ToolNotFound.as_str(), "TOOL_NOT_FOUND");
        assert_eq!(ErrorCode::RateLimited.as_str(), "429");
        assert_eq!(ErrorCode::Custom("E_DIAL".into()).as_str(), "E_DIAL");
    }

    #[test]
    fn error_code_serde_roundtrip() {
        let json = serde_json::to_string(&ErrorCode::RateLimited).unwrap();
        assert_eq!(json, "\"429\"");
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::RateLimited);

        let custom: ErrorCode = serde_json::from_str("\"E_DIAL\"").unwrap();
        assert_eq!(custom, ErrorCode::Custom("E_DIAL".into()));
    }

    #[test]
    fn schema_renders_json_schema() {
        let schema = ToolSchema::new()
            .property("query", PropertySchema::string("search text"))
            .property(
                "limit",
                PropertySchema::integer("max results").range(Some(1.0), Some(50.0)),
            )
            .required(["query"]);
        let rendered = schema.to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["query"]["type"], "string");
        assert_eq!(rendered["properties"]["limit"]["minimum"], 1.0);
        assert_eq!(rendered["required"], json!(["query"]));
    }

    #[test]
    fn failure_builder() {
        let failure = ToolFailure::new(ErrorCode::ToolNotFound, "no such tool")
            .unrecoverable()
            .with_remediation("list tools first");
        assert!(!failure.recoverable);
        assert_eq!(failure.remediation.as_deref(), Some("list tools first"));
    }

    #[test]
    fn result_accessors() {
        let ok = ToolResult::success(json!({"echo": "hi"}));
        assert!(ok.is_success());
        assert!(ok.error().is_none());

        let err = ToolResult::failure(ToolFailure::new(ErrorCode::NotFound, "missing"));
        assert!(!err.is_success());
        assert_eq!(err.error().unwrap().code, ErrorCode::NotFound);
    }
}
