//! Property-based tests: circular buffer invariants.

use proptest::prelude::*;
use relay_context::CircularBuffer;

proptest! {
    /// After M pushes into a buffer of capacity N, the buffer holds
    /// exactly the last min(M, N) items in insertion order.
    #[test]
    fn holds_last_n_in_order(
        capacity in 1usize..16,
        items in proptest::collection::vec(any::<u32>(), 0..64),
    ) {
        let mut buf = CircularBuffer::new(capacity);
        for item in &items {
            buf.push(*item);
        }

        let kept = items.len().min(capacity);
        let expected = &items[items.len() - kept..];
        prop_assert_eq!(buf.get_all(), expected.to_vec());
        prop_assert_eq!(buf.len(), kept);
    }

    /// get_recent(k) is always the tail of get_all().
    #[test]
    fn recent_is_a_suffix(
        capacity in 1usize..16,
        items in proptest::collection::vec(any::<u32>(), 0..64),
        count in 0usize..20,
    ) {
        let mut buf = CircularBuffer::new(capacity);
        for item in &items {
            buf.push(*item);
        }

        let all = buf.get_all();
        let recent = buf.get_recent(count);
        prop_assert!(recent.len() <= count.min(all.len()));
        prop_assert_eq!(&all[all.len() - recent.len()..], &recent[..]);
    }
}
