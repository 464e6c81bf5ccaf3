//! Bounded command queue and completion counter for the worker pipeline.
//!
//! The queue is the only cross-thread channel in the pipeline. Completion is
//! signaled by the counter, not by queue emptiness: a command that has been
//! popped but not yet finished must still hold back `wait_for_completion`.

use crate::geometry::VisualTriangle;
use std::sync::{Condvar, Mutex};

/// Number of commands the pipeline queue can hold.
pub const QUEUE_CAPACITY: usize = 128;

/// Fixed-capacity FIFO. Storage is allocated once at construction; read and
/// write cursors advance modulo the capacity with a separate occupancy
/// count, so every slot is usable.
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    read: usize,
    write: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be nonzero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots: slots.into_boxed_slice(),
            read: 0,
            write: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Pushes one element. The buffer must not be full.
    pub fn push(&mut self, value: T) {
        debug_assert!(!self.is_full());
        self.slots[self.write] = Some(value);
        self.write = (self.write + 1) % self.slots.len();
        self.len += 1;
    }

    /// Pops the least recently pushed element. The buffer must not be empty.
    pub fn pop(&mut self) -> T {
        debug_assert!(!self.is_empty());
        let value = self.slots[self.read].take();
        self.read = (self.read + 1) % self.slots.len();
        self.len -= 1;
        value.expect("ring buffer slot below len is occupied")
    }
}

/// Condition-variable-guarded counter that can be awaited at zero.
///
/// Deliberately not a bare atomic: waiters must block on the `== 0`
/// predicate, which needs the mutex/condvar pairing.
#[derive(Default)]
pub struct Counter {
    count: Mutex<u64>,
    changed: Condvar,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        self.changed.notify_all();
    }

    pub fn decrement(&self) {
        let mut count = self.count.lock().unwrap();
        debug_assert!(*count > 0);
        *count -= 1;
        self.changed.notify_all();
    }

    /// Blocks until the counter reaches zero.
    pub fn wait_until_zero(&self) {
        let mut count = self.count.lock().unwrap();
        while *count != 0 {
            count = self.changed.wait(count).unwrap();
        }
    }

    pub fn get(&self) -> u64 {
        *self.count.lock().unwrap()
    }
}

/// Commands traveling from the driver to the worker threads. Payloads move
/// with the command and are consumed by exactly one worker.
pub enum WorkerCommand {
    /// Voxelize one triangle into the worker's own map slot.
    Voxelize(VisualTriangle),
    /// Fold map slot `source` into map slot `target`, clearing `source`.
    /// The driver never issues two in-flight merges naming the same slot.
    Merge { target: usize, source: usize },
    /// Shut the worker down.
    Exit,
}

/// Bounded MPMC command queue pairing a ring buffer with a completion
/// counter. `issue` blocks while the queue is full, `receive` while it is
/// empty.
pub struct CommandQueue {
    buffer: Mutex<RingBuffer<WorkerCommand>>,
    not_empty: Condvar,
    not_full: Condvar,
    pending: Counter,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::with_capacity(QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(RingBuffer::new(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            pending: Counter::new(),
        }
    }

    /// Issues a command, blocking while the queue is full. Driver side.
    pub fn issue(&self, command: WorkerCommand) {
        self.pending.increment();
        let mut buffer = self.buffer.lock().unwrap();
        while buffer.is_full() {
            buffer = self.not_full.wait(buffer).unwrap();
        }
        buffer.push(command);
        self.not_empty.notify_one();
    }

    /// Takes the next command, blocking while the queue is empty. Worker
    /// side.
    pub fn receive(&self) -> WorkerCommand {
        let mut buffer = self.buffer.lock().unwrap();
        while buffer.is_empty() {
            buffer = self.not_empty.wait(buffer).unwrap();
        }
        let command = buffer.pop();
        self.not_full.notify_one();
        command
    }

    /// Reports one received command as finished. Worker side, called after
    /// the command has run.
    pub fn complete(&self) {
        self.pending.decrement();
    }

    /// Blocks until every issued command has been completed.
    pub fn wait_for_completion(&self) {
        self.pending.wait_until_zero();
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_is_fifo_across_wraparound() {
        let mut ring = RingBuffer::new(4);
        for round in 0..3 {
            for i in 0..4 {
                ring.push(round * 10 + i);
            }
            assert!(ring.is_full());
            for i in 0..4 {
                assert_eq!(ring.pop(), round * 10 + i);
            }
            assert!(ring.is_empty());
        }
    }

    #[test]
    fn counter_tracks_increments_and_decrements() {
        let counter = Counter::new();
        counter.increment();
        counter.increment();
        assert_eq!(counter.get(), 2);
        counter.decrement();
        counter.decrement();
        assert_eq!(counter.get(), 0);
        // Must not block at zero.
        counter.wait_until_zero();
    }
}
