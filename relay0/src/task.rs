//! Tasks — queued units of agent work with retry bookkeeping.

use crate::id::{AgentId, TaskId};
use crate::message::DEFAULT_PRIORITY;
use serde::{Deserialize, Serialize};

/// Where a task is in its life.
///
/// Transitions are monotonic — `Pending → Running → Completed | Failed |
/// Cancelled` — with one exception: `Failed → Pending` on retry, which
/// increments the retry count and clears the transient fields.
/// `Completed` and `Cancelled` are terminal.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue.
    Pending,
    /// Dispatched to its agent; a member of the running set.
    Running,
    /// Finished with a result. Terminal.
    Completed,
    /// Finished with an error. May re-enter `Pending` via retry.
    Failed,
    /// Cancelled before completion. Terminal.
    Cancelled,
}

impl TaskStatus {
    /// Whether this status allows no further transitions (other than
    /// the failed-task retry carve-out).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A queued unit of work targeted at one agent.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, stamped by the coordinator.
    pub id: TaskId,
    /// Free-form type tag, forwarded to the agent as `taskType`.
    pub task_type: String,
    /// The agent this task is dispatched to.
    pub agent: AgentId,
    /// Opaque structured payload, merged into the dispatch request.
    pub payload: serde_json::Value,
    /// Priority, default 5. Higher runs first.
    pub priority: u8,
    /// Current status.
    pub status: TaskStatus,
    /// Submission time, milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Set when the task enters `Running`.
    pub started_at: Option<u64>,
    /// Set when the task reaches a terminal status.
    pub completed_at: Option<u64>,
    /// How many times this task has been retried.
    pub retries: u32,
    /// Retry budget. A failed task re-enters the queue while
    /// `retries < max_retries`.
    pub max_retries: u32,
    /// The agent's response payload, on success.
    pub result: Option<serde_json::Value>,
    /// The terminal error, on failure.
    pub error: Option<String>,
}

impl Task {
    /// Create a pending task with zero retries.
    pub fn new(
        id: TaskId,
        task_type: impl Into<String>,
        agent: AgentId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            task_type: task_type.into(),
            agent,
            payload,
            priority: DEFAULT_PRIORITY,
            status: TaskStatus::Pending,
            created_at: crate::message::now_epoch_ms(),
            started_at: None,
            completed_at: None,
            retries: 0,
            max_retries: 0,
            result: None,
            error: None,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the submission timestamp (tests, replays).
    pub fn with_created_at(mut self, epoch_ms: u64) -> Self {
        self.created_at = epoch_ms;
        self
    }
}

/// A task draft handed to the coordinator, which stamps id, timestamps
/// and defaults on submission.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// Free-form type tag.
    pub task_type: String,
    /// The agent to dispatch to.
    pub agent: AgentId,
    /// Opaque structured payload.
    pub payload: serde_json::Value,
    /// Priority override. None means the default (5).
    pub priority: Option<u8>,
    /// Retry budget override. None means the configured default.
    pub max_retries: Option<u32>,
}

impl TaskSpec {
    /// Create a task draft.
    pub fn new(
        task_type: impl Into<String>,
        agent: AgentId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            task_type: task_type.into(),
            agent,
            payload,
            priority: None,
            max_retries: None,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_task_is_pending_with_defaults() {
        let task = Task::new(
            TaskId::new("t-1"),
            "reindex",
            AgentId::new("indexer"),
            json!({}),
        );
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert_eq!(task.retries, 0);
        assert!(task.started_at.is_none());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Running).unwrap(),
            "\"running\""
        );
    }
}
