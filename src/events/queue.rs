//! Time-ordered queue of pending events
//!
//! Pending events are kept sorted descending by (time, id) so the earliest
//! event pops off the end. Posting into the past, posting an event that has
//! already fired, or posting a second live event for the same subject are
//! invariant violations and abort.

use serde::{Deserialize, Serialize};

use crate::core::error::fatal;
use crate::core::types::{DetachmentId, EventId, Minute};
use crate::events::event::{Event, EventKind, Subject};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventQueue {
    now: Minute,
    next_id: u64,
    pending: Vec<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation clock
    pub fn now(&self) -> Minute {
        self.now
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending events, earliest first
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.pending.iter().rev()
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.pending.iter().find(|e| e.id == Some(id))
    }

    /// Time of the earliest pending event
    pub fn peek_time(&self) -> Option<Minute> {
        self.pending.last().map(|e| e.time)
    }

    /// The live event of a subject, if any
    pub fn pending_for(&self, subject: Subject) -> Option<EventId> {
        self.pending
            .iter()
            .find(|e| e.kind.subject() == subject)
            .and_then(|e| e.id)
    }

    fn insert_sorted(&mut self, event: Event) {
        let key = (event.time, event.id);
        let at = self.pending.partition_point(|e| (e.time, e.id) > key);
        self.pending.insert(at, event);
    }

    fn check_time(&self, time: Minute) {
        if time < self.now {
            fatal(&format!(
                "bad time sequence: event at {} posted at clock {}",
                time, self.now
            ));
        }
    }

    /// Insert an event in time order and return its id
    pub fn post(&mut self, mut event: Event) -> EventId {
        if event.occurred {
            fatal(&format!("event already occurred: {:?}", event.kind));
        }
        self.check_time(event.time);
        let subject = event.kind.subject();
        if self.pending_for(subject).is_some() {
            fatal(&format!("duplicate live event for {:?}", subject));
        }

        let id = EventId(self.next_id);
        self.next_id += 1;
        event.id = Some(id);
        tracing::trace!("post {} {} at {}", id, event.kind.name(), event.time);
        self.insert_sorted(event);
        id
    }

    pub fn schedule(&mut self, time: Minute, kind: EventKind) -> EventId {
        self.post(Event::new(time, kind))
    }

    /// Remove a live event
    pub fn unschedule(&mut self, id: EventId) -> Option<Event> {
        let at = self.pending.iter().position(|e| e.id == Some(id))?;
        Some(self.pending.remove(at))
    }

    /// Move a live event to a new time; false if the event is gone
    pub fn reschedule(&mut self, id: EventId, time: Minute) -> bool {
        self.check_time(time);
        match self.unschedule(id) {
            Some(mut event) => {
                event.time = time;
                self.insert_sorted(event);
                true
            }
            None => false,
        }
    }

    /// Remove every queued event that acts on a detachment
    pub fn purge(&mut self, detachment: DetachmentId) -> Vec<Event> {
        let (removed, kept) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|e| e.affects(detachment));
        self.pending = kept;
        removed
    }

    /// Pop the earliest event due at or before `end`, advancing the clock
    /// to its time and marking it occurred
    pub fn pop_due(&mut self, end: Minute) -> Option<Event> {
        if self.pending.last()?.time > end {
            return None;
        }
        let mut event = self.pending.pop()?;
        self.now = event.time;
        event.occurred = true;
        Some(event)
    }

    /// Advance the clock without firing anything
    pub fn advance_to(&mut self, time: Minute) {
        if time < self.now {
            fatal(&format!("bad time sequence: clock {} moved back to {}", self.now, time));
        }
        if let Some(next) = self.peek_time() {
            if next < time {
                fatal(&format!(
                    "bad time sequence: clock {} would skip pending event at {}",
                    time, next
                ));
            }
        }
        self.now = time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arena::Handle;

    fn recover(index: u32) -> EventKind {
        EventKind::Recover {
            detachment: DetachmentId(Handle::new(index, 0)),
        }
    }

    #[test]
    fn test_pops_in_time_order() {
        let mut queue = EventQueue::new();
        queue.schedule(30, recover(0));
        queue.schedule(10, recover(1));
        queue.schedule(20, recover(2));

        let times: Vec<Minute> = std::iter::from_fn(|| queue.pop_due(100))
            .map(|e| e.time)
            .collect();
        assert_eq!(times, vec![10, 20, 30]);
        assert_eq!(queue.now(), 30);
    }

    #[test]
    fn test_ties_fire_in_post_order() {
        let mut queue = EventQueue::new();
        let first = queue.schedule(10, recover(0));
        let second = queue.schedule(10, recover(1));
        assert_eq!(queue.pop_due(10).unwrap().id, Some(first));
        assert_eq!(queue.pop_due(10).unwrap().id, Some(second));
    }

    #[test]
    fn test_pop_due_respects_end() {
        let mut queue = EventQueue::new();
        queue.schedule(50, recover(0));
        assert!(queue.pop_due(49).is_none());
        let event = queue.pop_due(50).unwrap();
        assert!(event.occurred);
    }

    #[test]
    #[should_panic(expected = "bad time sequence")]
    fn test_post_in_past_is_fatal() {
        let mut queue = EventQueue::new();
        queue.schedule(20, recover(0));
        queue.pop_due(20);
        queue.schedule(19, recover(1));
    }

    #[test]
    #[should_panic(expected = "event already occurred")]
    fn test_repost_fired_event_is_fatal() {
        let mut queue = EventQueue::new();
        queue.schedule(5, recover(0));
        let event = queue.pop_due(5).unwrap();
        queue.post(event);
    }

    #[test]
    #[should_panic(expected = "duplicate live event")]
    fn test_second_event_for_subject_is_fatal() {
        let mut queue = EventQueue::new();
        queue.schedule(5, recover(0));
        queue.schedule(9, recover(0));
    }

    #[test]
    fn test_unschedule_and_reschedule() {
        let mut queue = EventQueue::new();
        let a = queue.schedule(10, recover(0));
        let b = queue.schedule(20, recover(1));

        assert!(queue.reschedule(b, 5));
        assert_eq!(queue.peek_time(), Some(5));
        assert!(queue.unschedule(a).is_some());
        assert!(queue.unschedule(a).is_none());
        assert!(!queue.reschedule(a, 30));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_purge_removes_only_that_detachment() {
        let mut queue = EventQueue::new();
        queue.schedule(10, recover(0));
        queue.schedule(15, recover(1));
        let removed = queue.purge(DetachmentId(Handle::new(0, 0)));
        assert_eq!(removed.len(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    #[should_panic(expected = "bad time sequence")]
    fn test_clock_cannot_run_backwards() {
        let mut queue = EventQueue::new();
        queue.advance_to(100);
        queue.advance_to(99);
    }
}
