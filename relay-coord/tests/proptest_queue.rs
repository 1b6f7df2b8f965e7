//! Property-based tests: task selection order.

use proptest::prelude::*;
use relay0::id::{AgentId, TaskId};
use relay0::task::Task;
use relay_coord::TaskQueue;
use serde_json::json;

proptest! {
    /// next_pending always returns the pending task with the smallest
    /// (−priority, created_at, id) key.
    #[test]
    fn selection_matches_the_sort_key(
        entries in proptest::collection::vec((0u8..10, 0u64..1000), 1..20),
    ) {
        let queue = TaskQueue::new(4);
        let mut expected: Option<(std::cmp::Reverse<u8>, u64, String)> = None;

        for (i, (priority, created_at)) in entries.iter().enumerate() {
            let id = format!("t-{i}");
            let task = Task::new(
                TaskId::new(&id),
                "work",
                AgentId::new("worker"),
                json!({}),
            )
            .with_priority(*priority)
            .with_created_at(*created_at);
            queue.enqueue(task).unwrap();

            let key = (std::cmp::Reverse(*priority), *created_at, id);
            if expected.as_ref().is_none_or(|best| &key < best) {
                expected = Some(key);
            }
        }

        let next = queue.next_pending().unwrap();
        let expected = expected.unwrap();
        prop_assert_eq!(next.id.as_str(), expected.2.as_str());
        prop_assert_eq!(next.priority, expected.0.0);
    }

    /// Draining one by one yields monotonically non-increasing
    /// priority among tasks sharing a creation time.
    #[test]
    fn drain_order_is_priority_sorted(
        priorities in proptest::collection::vec(0u8..10, 1..20),
    ) {
        let queue = TaskQueue::new(usize::MAX);
        for (i, priority) in priorities.iter().enumerate() {
            let task = Task::new(
                TaskId::new(format!("t-{i}")),
                "work",
                AgentId::new("worker"),
                json!({}),
            )
            .with_priority(*priority)
            .with_created_at(0);
            queue.enqueue(task).unwrap();
        }

        let mut last: Option<u8> = None;
        while let Some(task) = queue.next_pending() {
            if let Some(last) = last {
                prop_assert!(task.priority <= last);
            }
            last = Some(task.priority);
            queue.mark_running(&task.id).unwrap();
        }
    }
}
