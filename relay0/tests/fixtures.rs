//! Fixture behavior under the trait contracts.
//!
//! Requires: `cargo test --features test-utils`

#![cfg(feature = "test-utils")]

use relay0::test_utils::{EchoAdapter, EchoAgent, FailingAgent, StubContext};
use relay0::*;
use serde_json::json;

#[tokio::test]
async fn echo_agent_correlates_responses() {
    let agent = EchoAgent::new("echo");
    let request = Message::request(
        MessageId::new("m-9"),
        AgentId::new("caller"),
        AgentId::new("echo"),
        json!({"ping": true}),
    );
    let reply = agent.handle_message(&request).await.unwrap().unwrap();
    assert_eq!(reply.kind, MessageKind::Response);
    assert_eq!(reply.correlation_id, Some(request.id.clone()));
    assert_eq!(reply.payload, json!({"ping": true}));
}

#[tokio::test]
async fn echo_agent_ignores_non_requests() {
    let agent = EchoAgent::new("echo");
    let event = Message::event(
        MessageId::new("m-10"),
        AgentId::new("caller"),
        AgentId::new("echo"),
        json!({}),
    );
    assert!(agent.handle_message(&event).await.unwrap().is_none());
}

#[tokio::test]
async fn failing_agent_recovers_after_configured_failures() {
    let agent = FailingAgent::failing_first("flaky", 2);
    let request = Message::request(
        MessageId::new("m-11"),
        AgentId::new("caller"),
        AgentId::new("flaky"),
        json!({"work": 1}),
    );

    for _ in 0..2 {
        let reply = agent.handle_message(&request).await.unwrap().unwrap();
        assert_eq!(reply.kind, MessageKind::Error);
        assert_eq!(reply.correlation_id, Some(request.id.clone()));
    }
    let reply = agent.handle_message(&request).await.unwrap().unwrap();
    assert_eq!(reply.kind, MessageKind::Response);
    assert_eq!(agent.attempts(), 3);
}

#[tokio::test]
async fn stub_context_reports_missing_index() {
    let ctx = StubContext::new();
    assert!(!ctx.has_repository_index().await);
    assert!(matches!(
        ctx.repository_index().await,
        Err(ContextError::IndexNotSet)
    ));
}

#[tokio::test]
async fn echo_adapter_validates_message_type() {
    let adapter = EchoAdapter;
    let verdict = adapter.validate(&json!({"message": 123})).unwrap();
    assert!(!verdict.valid);
    assert!(verdict.error.unwrap().contains("message"));

    let verdict = adapter.validate(&json!({"message": "hi"})).unwrap();
    assert!(verdict.valid);
}
