//! Pending notifications for `xrPollEvent`.

use std::collections::VecDeque;

use crate::handle::SessionHandle;
use crate::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    SessionStateChanged {
        session: SessionHandle,
        state: SessionState,
        /// Runtime clock in nanoseconds.
        time: i64,
    },
}

/// Strict FIFO. Polling is destructive and never blocks.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.pending.push_back(event);
    }

    pub fn poll(&mut self) -> Option<Event> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
