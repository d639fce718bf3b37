//! The ordered idle set.
//!
//! Workers waiting for work sit in a min-heap keyed by `(fatigue, id)`.
//! Entries carry the fatigue captured when the worker was inserted; a
//! worker's counters only move while it is busy, so the captured score stays
//! valid for as long as the entry is in the set.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use parking_lot::{Condvar, Mutex};

#[derive(Clone, Copy, Debug)]
pub(crate) struct IdleEntry {
    pub(crate) fatigue: f64,
    pub(crate) worker: usize,
}

impl PartialEq for IdleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IdleEntry {}

impl PartialOrd for IdleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdleEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fatigue
            .total_cmp(&other.fatigue)
            .then_with(|| self.worker.cmp(&other.worker))
    }
}

pub(crate) struct IdleSet {
    heap: Mutex<BinaryHeap<Reverse<IdleEntry>>>,
    available: Condvar,
}

impl IdleSet {
    pub(crate) fn new() -> Self {
        IdleSet {
            heap: Mutex::new(BinaryHeap::new()),
            available: Condvar::new(),
        }
    }

    /// Blocks until the set is non-empty, then removes and returns the
    /// least-fatigued entry (ties broken by worker id).
    pub(crate) fn take(&self) -> IdleEntry {
        let mut heap = self.heap.lock();
        loop {
            if let Some(Reverse(entry)) = heap.pop() {
                return entry;
            }
            self.available.wait(&mut heap);
        }
    }

    /// Inserts an entry and wakes one waiter.
    pub(crate) fn put(&self, entry: IdleEntry) {
        self.heap.lock().push(Reverse(entry));
        self.available.notify_one();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.heap.lock().len()
    }
}
