//! The sleep index (spec §4.3, component C4): a wake-quantum to thread-ids
//! multimap that lets the wake sweep avoid scanning every TCB each tick.

use std::collections::HashMap;

#[derive(Default)]
pub struct SleepIndex {
    by_wake_quantum: HashMap<i64, Vec<i32>>,
}

impl SleepIndex {
    pub fn new() -> SleepIndex {
        SleepIndex { by_wake_quantum: HashMap::new() }
    }

    /// Records that `id` should be reconsidered when `total_quantums`
    /// reaches `wake_at`.
    pub fn insert(&mut self, wake_at: i64, id: i32) {
        self.by_wake_quantum.entry(wake_at).or_default().push(id);
    }

    /// Removes and returns every id due to wake at exactly `wake_at`.
    pub fn take_due(&mut self, wake_at: i64) -> Vec<i32> {
        self.by_wake_quantum.remove(&wake_at).unwrap_or_default()
    }

    /// Drops `id` out of whichever bucket it's in, for when a sleeping
    /// thread is terminated out from under its own wake entry (spec §9,
    /// "does terminate on a blocked/sleeping thread purge sleep index
    /// references? yes").
    pub fn remove(&mut self, wake_at: i64, id: i32) {
        if let Some(bucket) = self.by_wake_quantum.get_mut(&wake_at) {
            bucket.retain(|&queued| queued != id);
            if bucket.is_empty() {
                self.by_wake_quantum.remove(&wake_at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_due_drains_only_the_matching_bucket() {
        let mut index = SleepIndex::new();
        index.insert(10, 1);
        index.insert(10, 2);
        index.insert(12, 3);

        let due = index.take_due(10);
        assert_eq!(due, vec![1, 2]);
        assert!(index.take_due(10).is_empty());
        assert_eq!(index.take_due(12), vec![3]);
    }

    #[test]
    fn remove_drops_a_single_id_without_disturbing_siblings() {
        let mut index = SleepIndex::new();
        index.insert(10, 1);
        index.insert(10, 2);
        index.remove(10, 1);
        assert_eq!(index.take_due(10), vec![2]);
    }
}
