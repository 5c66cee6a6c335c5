//! History of fired events, newest first

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::DetachmentId;
use crate::events::event::Event;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventLog {
    entries: VecDeque<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fired event; kinds that are not logged are dropped
    pub fn record(&mut self, event: Event) -> bool {
        if !event.kind.is_logged() {
            return false;
        }
        self.entries.push_front(event);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in time-descending order
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Event> {
        self.entries.front()
    }

    pub fn entries_for(&self, detachment: DetachmentId) -> impl Iterator<Item = &Event> {
        self.entries.iter().filter(move |e| e.affects(detachment))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
