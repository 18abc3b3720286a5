//! The id allocator (spec §4.1, component C2).
//!
//! Mirrors the original's `std::priority_queue` of freed ids ordered as a
//! min-heap, using `Reverse` the way `std::collections::BinaryHeap` expects
//! for a min-heap in safe Rust.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::config::MAX_THREAD_NUM;
use crate::error::ThreadError;

/// Assigns the smallest unused non-negative id within `[0, MAX_THREAD_NUM)`.
pub struct IdAllocator {
    freed_ids: BinaryHeap<Reverse<i32>>,
    next_fresh_id: i32,
    live_count: usize,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator {
            freed_ids: BinaryHeap::new(),
            next_fresh_id: 0,
            live_count: 0,
        }
    }

    /// Returns the number of currently live ids.
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Allocates the smallest unused id, failing when `MAX_THREAD_NUM` ids
    /// are already live.
    pub fn alloc(&mut self) -> Result<i32, ThreadError> {
        if self.live_count >= MAX_THREAD_NUM {
            return Err(ThreadError::TooManyThreads(MAX_THREAD_NUM));
        }

        let id = match self.freed_ids.pop() {
            Some(Reverse(id)) => id,
            None => {
                let id = self.next_fresh_id;
                self.next_fresh_id += 1;
                id
            }
        };

        self.live_count += 1;
        Ok(id)
    }

    /// Returns `id` to the freed pool for future reuse.
    pub fn release(&mut self, id: i32) {
        self.freed_ids.push(Reverse(id));
        self.live_count -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_the_minimum_freed_id() {
        let mut alloc = IdAllocator::new();
        let a = alloc.alloc().unwrap();
        let b = alloc.alloc().unwrap();
        let c = alloc.alloc().unwrap();
        assert_eq!((a, b, c), (0, 1, 2));

        alloc.release(b);
        let next = alloc.alloc().unwrap();
        assert_eq!(next, b, "the minimum freed id must be reused first");

        let after = alloc.alloc().unwrap();
        assert_eq!(after, 3, "once freed ids are exhausted, mint a fresh one");
    }

    #[test]
    fn fails_once_the_cap_is_reached() {
        let mut alloc = IdAllocator::new();
        for _ in 0..MAX_THREAD_NUM {
            alloc.alloc().unwrap();
        }
        assert!(alloc.alloc().is_err());
    }
}
