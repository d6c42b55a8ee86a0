//! Event queues and external event sources.

use crate::core::{Event, EventPriority};
use std::collections::VecDeque;
use std::sync::mpsc::Receiver;

/// Single-consumer FIFO of posted events.
///
/// A closed queue drops everything posted to it; the machine keeps its
/// queue closed while stopped.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
    open: bool,
    capacity: Option<usize>,
}

impl EventQueue {
    /// Create a closed queue holding at most `capacity` events.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            events: VecDeque::new(),
            open: false,
            capacity,
        }
    }

    /// Append `event`. Returns `false` when the event was dropped.
    pub fn post(&mut self, event: Event) -> bool {
        self.post_with_priority(event, EventPriority::Normal)
    }

    /// Queue `event`; `High` priority jumps ahead of everything queued.
    pub fn post_with_priority(&mut self, event: Event, priority: EventPriority) -> bool {
        if !self.open {
            tracing::debug!(%event, "queue closed, dropping event");
            return false;
        }
        if self.capacity.is_some_and(|cap| self.events.len() >= cap) {
            tracing::warn!(%event, len = self.events.len(), "event queue full, dropping event");
            return false;
        }

        match priority {
            EventPriority::High => self.events.push_front(event),
            EventPriority::Normal => self.events.push_back(event),
        }
        true
    }

    pub fn next(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn peek(&self) -> Option<&Event> {
        self.events.front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn open(&mut self) {
        self.open = true;
    }

    /// Close the queue and discard its contents.
    pub(crate) fn close(&mut self) {
        self.open = false;
        self.events.clear();
    }
}

/// Anything that can hand pending events to a machine.
///
/// The machine drains a source on its own thread; sources fed from other
/// threads must do their own synchronization.
pub trait EventSource {
    /// Take every event that is ready now without blocking.
    fn drain(&mut self) -> impl Iterator<Item = Event> + '_;
}

impl EventSource for Receiver<Event> {
    fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.try_iter()
    }
}

impl EventSource for Vec<Event> {
    fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        Vec::drain(self, ..)
    }
}

impl EventSource for VecDeque<Event> {
    fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        VecDeque::drain(self, ..)
    }
}
