//! The message envelope — the unit of routing between agents.

use crate::duration::DurationMs;
use crate::id::{AgentId, MessageId};
use serde::{Deserialize, Serialize};

/// Default priority for messages and tasks. Higher is more urgent.
pub const DEFAULT_PRIORITY: u8 = 5;

/// What a routed message is.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Asks the recipient to do something and expects a reply.
    Request,
    /// A successful reply. Carries `correlation_id == request.id`.
    Response,
    /// Fire-and-forget notification. No reply expected.
    Event,
    /// A failed reply. Carries `correlation_id == request.id`.
    Error,
}

/// The routed message envelope.
///
/// Messages are immutable once created — the coordinator appends a clone
/// to history before delivery, and handlers receive a shared reference.
/// The payload is an opaque JSON value; each agent documents the closed
/// set of request/response shapes it understands.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, stamped by the coordinator (or the creator).
    pub id: MessageId,
    /// What this message is.
    pub kind: MessageKind,
    /// Name of the sending agent (or `"coordinator"` / an embedder name).
    pub sender: AgentId,
    /// Name of the receiving agent.
    pub recipient: AgentId,
    /// For responses and errors: the id of the originating request.
    pub correlation_id: Option<MessageId>,
    /// Opaque structured payload.
    pub payload: serde_json::Value,
    /// Priority, default 5. Higher is more urgent.
    pub priority: u8,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Per-message delivery timeout override. None uses the
    /// coordinator's default.
    pub timeout: Option<DurationMs>,
}

impl Message {
    /// Create a request message. Priority defaults to 5; the creation
    /// timestamp is stamped from the wall clock.
    pub fn request(
        id: MessageId,
        sender: AgentId,
        recipient: AgentId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            kind: MessageKind::Request,
            sender,
            recipient,
            correlation_id: None,
            payload,
            priority: DEFAULT_PRIORITY,
            created_at: now_epoch_ms(),
            timeout: None,
        }
    }

    /// Create a response to a request. Sender and recipient are swapped
    /// from the request and `correlation_id` is set to the request id.
    /// The derived id is unique as long as request ids are.
    pub fn response_to(request: &Message, payload: serde_json::Value) -> Self {
        Self {
            id: reply_id(request),
            kind: MessageKind::Response,
            sender: request.recipient.clone(),
            recipient: request.sender.clone(),
            correlation_id: Some(request.id.clone()),
            payload,
            priority: request.priority,
            created_at: now_epoch_ms(),
            timeout: None,
        }
    }

    /// Create an error reply to a request. Same correlation rules as
    /// [`Message::response_to`].
    pub fn error_to(request: &Message, payload: serde_json::Value) -> Self {
        Self {
            kind: MessageKind::Error,
            ..Self::response_to(request, payload)
        }
    }

    /// Create an event message. Events carry no correlation id and
    /// expect no reply.
    pub fn event(
        id: MessageId,
        sender: AgentId,
        recipient: AgentId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            kind: MessageKind::Event,
            sender,
            recipient,
            correlation_id: None,
            payload,
            priority: DEFAULT_PRIORITY,
            created_at: now_epoch_ms(),
            timeout: None,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Set a per-message delivery timeout.
    pub fn with_timeout(mut self, timeout: DurationMs) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the kind.
    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Override the creation timestamp (tests, replays).
    pub fn with_created_at(mut self, epoch_ms: u64) -> Self {
        self.created_at = epoch_ms;
        self
    }
}

/// A message draft handed to the coordinator, which stamps identity
/// (id, sender, timestamp) on delivery. Agents build drafts; only the
/// coordinator mints complete [`Message`] values.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// What kind of message to send. Almost always a request.
    pub kind: MessageKind,
    /// The target agent. Ignored by broadcast.
    pub recipient: AgentId,
    /// Opaque structured payload.
    pub payload: serde_json::Value,
    /// Priority override. None means the default (5).
    pub priority: Option<u8>,
    /// Delivery timeout override. None means the coordinator default.
    pub timeout: Option<DurationMs>,
}

impl OutboundMessage {
    /// Create a request draft for the given recipient.
    pub fn request(recipient: AgentId, payload: serde_json::Value) -> Self {
        Self {
            kind: MessageKind::Request,
            recipient,
            payload,
            priority: None,
            timeout: None,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set a delivery timeout.
    pub fn with_timeout(mut self, timeout: DurationMs) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Derive a reply id from a request. Includes the responder so a
/// broadcast producing several replies still yields distinct ids.
fn reply_id(request: &Message) -> MessageId {
    MessageId::new(format!("{}-reply-{}", request.id, request.recipient))
}

/// Milliseconds since the Unix epoch.
pub fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> Message {
        Message::request(
            MessageId::new("m-1"),
            AgentId::new("planner"),
            AgentId::new("search"),
            json!({"query": "ranking"}),
        )
    }

    #[test]
    fn response_correlates_and_swaps_direction() {
        let req = request();
        let resp = Message::response_to(&req, json!({"hits": 3}));
        assert_eq!(resp.kind, MessageKind::Response);
        assert_eq!(resp.correlation_id, Some(req.id.clone()));
        assert_eq!(resp.sender, req.recipient);
        assert_eq!(resp.recipient, req.sender);
    }

    #[test]
    fn error_reply_keeps_correlation() {
        let req = request();
        let err = Message::error_to(&req, json!({"error": "index not ready"}));
        assert_eq!(err.kind, MessageKind::Error);
        assert_eq!(err.correlation_id, Some(req.id));
    }

    #[test]
    fn broadcast_replies_have_distinct_ids() {
        let mut a = request();
        a.recipient = AgentId::new("alpha");
        let mut b = request();
        b.recipient = AgentId::new("beta");
        assert_ne!(
            Message::response_to(&a, json!(null)).id,
            Message::response_to(&b, json!(null)).id
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&MessageKind::Request).unwrap(),
            "\"request\""
        );
        assert_eq!(
            serde_json::to_string(&MessageKind::Error).unwrap(),
            "\"error\""
        );
    }
}
