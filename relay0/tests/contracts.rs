//! Acceptance tests for the protocol crate.
//!
//! Tests cover:
//! - Trait object safety (Arc/Box<dyn Trait> is Send + Sync)
//! - Message and task serialization round-trips
//! - Typed ID conversions
//! - Error code wire stability

use relay0::*;
use serde_json::json;
use std::sync::Arc;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Object Safety: Box<dyn Trait> compiles and is Send + Sync
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn _assert_send_sync<T: Send + Sync>() {}

#[test]
fn agent_is_object_safe_send_sync() {
    _assert_send_sync::<Box<dyn Agent>>();
    _assert_send_sync::<Arc<dyn Agent>>();
}

#[test]
fn tool_adapter_is_object_safe_send_sync() {
    _assert_send_sync::<Box<dyn ToolAdapter>>();
    _assert_send_sync::<Arc<dyn ToolAdapter>>();
}

#[test]
fn storage_backend_is_object_safe_send_sync() {
    _assert_send_sync::<Box<dyn StorageBackend>>();
    _assert_send_sync::<Arc<dyn StorageBackend>>();
}

#[test]
fn shared_context_is_object_safe_send_sync() {
    _assert_send_sync::<Arc<dyn SharedContext>>();
}

#[test]
fn message_sender_is_object_safe_send_sync() {
    _assert_send_sync::<Arc<dyn MessageSender>>();
}

#[test]
fn collaborators_are_object_safe_send_sync() {
    _assert_send_sync::<Arc<dyn RepositoryIndex>>();
    _assert_send_sync::<Arc<dyn GitSource>>();
    _assert_send_sync::<Arc<dyn GitHubSource>>();
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Typed IDs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test]
fn typed_ids_convert_and_display() {
    let id = AgentId::new("search");
    assert_eq!(id.as_str(), "search");
    assert_eq!(id.to_string(), "search");
    assert_eq!(AgentId::from("search"), id);
    assert_eq!(AgentId::from(String::from("search")), id);
}

#[test]
fn typed_ids_serialize_as_plain_strings() {
    let id = TaskId::new("t-42");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"t-42\"");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Serialization round-trips
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test]
fn message_roundtrips_through_json() {
    let msg = Message::request(
        MessageId::new("m-1"),
        AgentId::new("planner"),
        AgentId::new("search"),
        json!({"query": "token bucket"}),
    )
    .with_priority(8)
    .with_timeout(DurationMs::from_millis(500));

    let encoded = serde_json::to_string(&msg).unwrap();
    let decoded: Message = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded.id, msg.id);
    assert_eq!(decoded.kind, MessageKind::Request);
    assert_eq!(decoded.priority, 8);
    assert_eq!(decoded.timeout, Some(DurationMs::from_millis(500)));
    assert_eq!(decoded.payload, msg.payload);
}

#[test]
fn task_roundtrips_through_json() {
    let task = Task::new(
        TaskId::new("t-1"),
        "summarize",
        AgentId::new("planner"),
        json!({"path": "src/lib.rs"}),
    )
    .with_max_retries(2);

    let encoded = serde_json::to_value(&task).unwrap();
    assert_eq!(encoded["status"], "pending");
    let decoded: Task = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded.max_retries, 2);
    assert_eq!(decoded.status, TaskStatus::Pending);
}

#[test]
fn tool_result_tags_by_status() {
    let ok = ToolResult::success(json!({"hits": []}));
    let encoded = serde_json::to_value(&ok).unwrap();
    assert_eq!(encoded["status"], "success");

    let failed = ToolResult::failure(ToolFailure::new(ErrorCode::IndexNotReady, "run indexing"));
    let encoded = serde_json::to_value(&failed).unwrap();
    assert_eq!(encoded["status"], "failure");
    assert_eq!(encoded["error"]["code"], "INDEX_NOT_READY");
}

#[test]
fn gh_document_state_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&GhState::Merged).unwrap(), "\"merged\"");
    assert_eq!(
        serde_json::to_string(&GhDocType::PullRequest).unwrap(),
        "\"pull_request\""
    );
}
