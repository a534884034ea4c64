//! Bounded in-memory error queue
//!
//! FIFO queue with oldest-first eviction, exclusively owned by the telemetry
//! task. Flushing takes an atomic snapshot so records captured while a send
//! is in flight start a fresh batch; a failed send restores the snapshot at
//! the head, ahead of anything captured during the attempt.

use std::collections::VecDeque;

use crate::telemetry::record::ErrorRecord;

// ----------------------------------------------------------------------------
// Error Queue
// ----------------------------------------------------------------------------

/// Capacity-bounded FIFO queue of captured error records
#[derive(Debug)]
pub struct ErrorQueue {
    records: VecDeque<ErrorRecord>,
    max_size: usize,
}

impl ErrorQueue {
    /// Create a queue with the given capacity bound
    pub fn new(max_size: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Append a record at the tail, evicting from the head if over the bound
    ///
    /// Returns the number of records evicted.
    pub fn push(&mut self, record: ErrorRecord) -> usize {
        self.records.push_back(record);
        self.evict_to_bound()
    }

    /// Snapshot and clear the queue in one step
    pub fn take_batch(&mut self) -> Vec<ErrorRecord> {
        self.records.drain(..).collect()
    }

    /// Re-insert a failed batch at the head, preserving its original order
    ///
    /// The queue may transiently exceed its bound during the insert; the
    /// bound is re-applied afterwards (oldest restored records drop first).
    /// Returns the number of records evicted.
    pub fn restore_batch(&mut self, batch: Vec<ErrorRecord>) -> usize {
        for record in batch.into_iter().rev() {
            self.records.push_front(record);
        }
        self.evict_to_bound()
    }

    /// Number of queued records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Capacity bound
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn evict_to_bound(&mut self) -> usize {
        let mut evicted = 0;
        while self.records.len() > self.max_size {
            self.records.pop_front();
            evicted += 1;
        }
        evicted
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
