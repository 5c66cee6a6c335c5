//! Scheduled actions
//!
//! Event kinds form a closed set. Each kind has a *subject* (the combat or
//! detachment it belongs to); at most one live event per subject may sit in
//! the queue at a time.

use serde::{Deserialize, Serialize};

use crate::core::types::{CombatId, DetachmentId, EventId, Minute};
use crate::force::MovePurpose;
use crate::map::HexCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A detachment reaches its breaking point and disrupts
    Disrupt {
        combat: CombatId,
        detachment: DetachmentId,
    },
    /// A disrupted detachment gives up the fight and falls back
    Retreat {
        combat: CombatId,
        detachment: DetachmentId,
    },
    /// A march step completes
    Arrive {
        detachment: DetachmentId,
        to: HexCoord,
        purpose: MovePurpose,
    },
    /// Disruption or regrouping is over
    Recover { detachment: DetachmentId },
}

/// Owner of an event, for the one-live-event-per-subject rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Combat(CombatId),
    Detachment(DetachmentId),
}

impl EventKind {
    pub fn subject(&self) -> Subject {
        match *self {
            EventKind::Disrupt { combat, .. } | EventKind::Retreat { combat, .. } => {
                Subject::Combat(combat)
            }
            EventKind::Arrive { detachment, .. } | EventKind::Recover { detachment } => {
                Subject::Detachment(detachment)
            }
        }
    }

    /// The detachment the event acts on
    pub fn detachment(&self) -> DetachmentId {
        match *self {
            EventKind::Disrupt { detachment, .. }
            | EventKind::Retreat { detachment, .. }
            | EventKind::Arrive { detachment, .. }
            | EventKind::Recover { detachment } => detachment,
        }
    }

    /// Whether the event is kept in the history log once it fires
    pub fn is_logged(&self) -> bool {
        !matches!(self, EventKind::Recover { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Disrupt { .. } => "disrupt",
            EventKind::Retreat { .. } => "retreat",
            EventKind::Arrive { .. } => "arrive",
            EventKind::Recover { .. } => "recover",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned when the event is posted
    pub id: Option<EventId>,
    pub time: Minute,
    pub occurred: bool,
    pub kind: EventKind,
}

impl Event {
    pub fn new(time: Minute, kind: EventKind) -> Self {
        Self {
            id: None,
            time,
            occurred: false,
            kind,
        }
    }

    pub fn affects(&self, detachment: DetachmentId) -> bool {
        self.kind.detachment() == detachment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arena::Handle;

    #[test]
    fn test_subjects() {
        let combat = CombatId(Handle::new(1, 0));
        let det = DetachmentId(Handle::new(2, 0));

        let disrupt = EventKind::Disrupt {
            combat,
            detachment: det,
        };
        assert_eq!(disrupt.subject(), Subject::Combat(combat));
        assert_eq!(disrupt.detachment(), det);
        assert!(disrupt.is_logged());

        let recover = EventKind::Recover { detachment: det };
        assert_eq!(recover.subject(), Subject::Detachment(det));
        assert!(!recover.is_logged());
        assert!(Event::new(5, recover).affects(det));
    }
}
