//! Bounded, in-memory intake queue.

use std::collections::VecDeque;

use crate::event::ValidatedEvent;

/// An ordered sequence of validated events with a hard capacity.
///
/// Overflow is the caller's problem to report (as a `QueueOverflow`
/// outcome) — this type just refuses the push and hands the event back.
pub(crate) struct BoundedQueue {
    events: VecDeque<ValidatedEvent>,
    capacity: usize,
}

impl BoundedQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.events.len() >= self.capacity
    }

    /// Push if there's room; otherwise hand the event back to the caller.
    pub(crate) fn try_push(&mut self, event: ValidatedEvent) -> Result<(), ValidatedEvent> {
        if self.is_full() {
            return Err(event);
        }
        self.events.push_back(event);
        Ok(())
    }

    /// Remove up to `n` events from the front, preserving order.
    pub(crate) fn take_prefix(&mut self, n: usize) -> Vec<ValidatedEvent> {
        let n = n.min(self.events.len());
        self.events.drain(..n).collect()
    }
}
