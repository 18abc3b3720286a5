//! The ready queue (spec §4.2, component C3).

use std::collections::VecDeque;

/// A strict FIFO of runnable thread ids. By convention the front id is the
/// currently running thread.
#[derive(Default)]
pub struct ReadyQueue {
    ids: VecDeque<i32>,
}

impl ReadyQueue {
    pub fn new() -> ReadyQueue {
        ReadyQueue { ids: VecDeque::new() }
    }

    /// Appends `id`. Callers keep the no-duplicates invariant (spec §8
    /// invariant 6) by the time a scheduler pass finishes, but a `sleep(0)`
    /// woken by the same pass that is yielding it legitimately sees `id`
    /// queued twice for one instant: the wake sweep appends the woken copy
    /// before the yield's own pop removes the stale running-slot copy.
    pub fn push_back(&mut self, id: i32) {
        self.ids.push_back(id);
    }

    pub fn front(&self) -> Option<i32> {
        self.ids.front().copied()
    }

    pub fn pop_front(&mut self) -> Option<i32> {
        self.ids.pop_front()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Removes `id` wherever it sits in the queue (spec §4.2's
    /// remove-by-id). A no-op if `id` isn't queued.
    pub fn remove(&mut self, id: i32) {
        self.ids.retain(|&queued| queued != id);
    }

    pub fn contains(&self, id: i32) -> bool {
        self.ids.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_moves_front_to_tail() {
        let mut q = ReadyQueue::new();
        q.push_back(0);
        q.push_back(1);
        q.push_back(2);

        let front = q.pop_front().unwrap();
        q.push_back(front);

        assert_eq!(q.front(), Some(1));
        let mut remaining = Vec::new();
        while let Some(id) = q.pop_front() {
            remaining.push(id);
        }
        assert_eq!(remaining, vec![1, 2, 0]);
    }

    #[test]
    fn remove_by_id_is_a_no_op_when_absent() {
        let mut q = ReadyQueue::new();
        q.push_back(5);
        q.remove(99);
        assert_eq!(q.front(), Some(5));
    }
}
