//! Bounded-concurrency task queue with priority ordering and retry
//! bookkeeping.

use relay0::error::CoordError;
use relay0::id::TaskId;
use relay0::message::now_epoch_ms;
use relay0::task::{Task, TaskStatus};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Task counts by status, plus the concurrency bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// Tasks waiting to run.
    pub pending: usize,
    /// Tasks currently running.
    pub running: usize,
    /// Tasks completed successfully.
    pub completed: usize,
    /// Tasks in terminal failure.
    pub failed: usize,
    /// Tasks cancelled.
    pub cancelled: usize,
    /// The concurrency bound.
    pub max_concurrent: usize,
}

struct Inner {
    tasks: HashMap<TaskId, Task>,
    running: HashSet<TaskId>,
}

/// A priority + FIFO queue of tasks with running-set accounting.
///
/// Selection order is `(−priority, created_at, id)`: highest priority
/// first, ties broken by earliest submission, then by id for
/// determinism. The running set never exceeds `max_concurrent`; with a
/// bound of zero nothing is ever dispatched.
///
/// All operations are synchronous under one internal lock — nothing
/// here suspends, so callers may use the queue from any context.
pub struct TaskQueue {
    inner: Mutex<Inner>,
    max_concurrent: usize,
}

impl TaskQueue {
    /// Create an empty queue with the given concurrency bound.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tasks: HashMap::new(),
                running: HashSet::new(),
            }),
            max_concurrent,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("task queue poisoned")
    }

    /// Add a task. Fails if the id is already known.
    pub fn enqueue(&self, task: Task) -> Result<(), CoordError> {
        let mut inner = self.lock();
        if inner.tasks.contains_key(&task.id) {
            return Err(CoordError::DuplicateTask(task.id.to_string()));
        }
        inner.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// The pending task that should run next, if any.
    pub fn next_pending(&self) -> Option<Task> {
        let inner = self.lock();
        inner
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .min_by_key(|t| (Reverse(t.priority), t.created_at, t.id.clone()))
            .cloned()
    }

    /// Move a pending task into the running set.
    pub fn mark_running(&self, id: &TaskId) -> Result<(), CoordError> {
        let mut inner = self.lock();
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| CoordError::TaskNotFound(id.to_string()))?;
        if task.status != TaskStatus::Pending {
            return Err(invalid(task, TaskStatus::Running));
        }
        task.status = TaskStatus::Running;
        task.started_at = Some(now_epoch_ms());
        inner.running.insert(id.clone());
        Ok(())
    }

    /// Complete a running task with its result. Terminal.
    pub fn mark_completed(
        &self,
        id: &TaskId,
        result: serde_json::Value,
    ) -> Result<(), CoordError> {
        let mut inner = self.lock();
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| CoordError::TaskNotFound(id.to_string()))?;
        if task.status != TaskStatus::Running {
            return Err(invalid(task, TaskStatus::Completed));
        }
        task.status = TaskStatus::Completed;
        task.completed_at = Some(now_epoch_ms());
        task.result = Some(result);
        inner.running.remove(id);
        Ok(())
    }

    /// Fail a running task with an error. Retryable while the retry
    /// budget lasts.
    pub fn mark_failed(&self, id: &TaskId, error: impl Into<String>) -> Result<(), CoordError> {
        let mut inner = self.lock();
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| CoordError::TaskNotFound(id.to_string()))?;
        if task.status != TaskStatus::Running {
            return Err(invalid(task, TaskStatus::Failed));
        }
        task.status = TaskStatus::Failed;
        task.completed_at = Some(now_epoch_ms());
        task.error = Some(error.into());
        inner.running.remove(id);
        Ok(())
    }

    /// Cancel a pending or running task. Terminal.
    pub fn cancel(&self, id: &TaskId) -> Result<(), CoordError> {
        let mut inner = self.lock();
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| CoordError::TaskNotFound(id.to_string()))?;
        if task.status.is_terminal() {
            return Err(invalid(task, TaskStatus::Cancelled));
        }
        task.status = TaskStatus::Cancelled;
        task.completed_at = Some(now_epoch_ms());
        inner.running.remove(id);
        Ok(())
    }

    /// Whether a failed task still has retry budget.
    pub fn should_retry(&self, id: &TaskId) -> bool {
        let inner = self.lock();
        inner
            .tasks
            .get(id)
            .is_some_and(|t| t.status == TaskStatus::Failed && t.retries < t.max_retries)
    }

    /// Re-queue a failed task: status back to pending, retry count up,
    /// transient fields cleared. Requires [`TaskQueue::should_retry`].
    pub fn retry(&self, id: &TaskId) -> Result<(), CoordError> {
        let mut inner = self.lock();
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| CoordError::TaskNotFound(id.to_string()))?;
        if task.status != TaskStatus::Failed || task.retries >= task.max_retries {
            return Err(CoordError::NotRetryable(id.to_string()));
        }
        task.status = TaskStatus::Pending;
        task.retries += 1;
        task.started_at = None;
        task.completed_at = None;
        task.error = None;
        task.result = None;
        Ok(())
    }

    /// Whether another task may enter the running set.
    pub fn can_run_more(&self) -> bool {
        self.lock().running.len() < self.max_concurrent
    }

    /// Remove terminal tasks whose completion is older than the
    /// horizon. Returns how many were removed.
    pub fn cleanup(&self, older_than_ms: u64) -> usize {
        let cutoff = now_epoch_ms().saturating_sub(older_than_ms);
        let mut inner = self.lock();
        let before = inner.tasks.len();
        inner.tasks.retain(|_, t| {
            !(t.status.is_terminal() && t.completed_at.is_some_and(|at| at < cutoff))
        });
        before - inner.tasks.len()
    }

    /// A copy of one task.
    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.lock().tasks.get(id).cloned()
    }

    /// Counts by status plus the concurrency bound.
    pub fn stats(&self) -> QueueStats {
        let inner = self.lock();
        let mut stats = QueueStats {
            max_concurrent: self.max_concurrent,
            ..QueueStats::default()
        };
        for task in inner.tasks.values() {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
                _ => {}
            }
        }
        stats
    }
}

fn invalid(task: &Task, to: TaskStatus) -> CoordError {
    CoordError::InvalidTransition {
        task: task.id.to_string(),
        from: task.status.to_string(),
        to: to.to_string(),
    }
}
