//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::core::arena::{ArenaKey, Handle};

/// Simulation clock, in whole minutes since scenario start
pub type Minute = u64;

pub const MINUTES_PER_DAY: Minute = 24 * 60;

/// Handle to a deployed detachment
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "detachment {}", _0)]
pub struct DetachmentId(pub Handle);

impl DetachmentId {
    /// Placeholder for a detachment not yet added to a theater
    pub const UNASSIGNED: Self = Self(Handle {
        index: u32::MAX,
        generation: 0,
    });
}

impl ArenaKey for DetachmentId {
    fn from_handle(handle: Handle) -> Self {
        Self(handle)
    }
    fn handle(&self) -> Handle {
        self.0
    }
}

/// Handle to a live combat
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "combat {}", _0)]
pub struct CombatId(pub Handle);

impl ArenaKey for CombatId {
    fn from_handle(handle: Handle) -> Self {
        Self(handle)
    }
    fn handle(&self) -> Handle {
        self.0
    }
}

/// Handle to a queued event (monotonic sequence number)
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "event #{}", _0)]
pub struct EventId(pub u64);

/// Owning player / alliance. Detachments of different forces are hostile.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(fmt = "force {}", _0)]
pub struct ForceId(pub u8);

impl ForceId {
    pub fn opposes(&self, other: ForceId) -> bool {
        self.0 != other.0
    }
}

/// Which roster of a combat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_opposition() {
        assert!(ForceId(1).opposes(ForceId(2)));
        assert!(!ForceId(1).opposes(ForceId(1)));
    }

    #[test]
    fn test_side_opponent() {
        assert_eq!(Side::Attacker.opponent(), Side::Defender);
        assert_eq!(Side::Defender.opponent(), Side::Attacker);
    }

    #[test]
    fn test_id_display() {
        let id = CombatId(Handle::new(3, 1));
        assert_eq!(id.to_string(), "combat 3v1");
        assert_eq!(EventId(7).to_string(), "event #7");
    }
}
